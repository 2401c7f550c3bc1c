//! Admin widget model for managing pivots.
//!
//! # Responsibility
//! - Build the data the pivot widget displays for one source and target type.
//! - Model the client-side sortable list and its synchronization round-trip.
//!
//! # Invariants
//! - The list state is dirty after any local change and clean only after a
//!   successful save or a fresh load.

mod list_state;
mod pivot_widget;

pub use list_state::{ListStateError, PivotListEntry, PivotListState};
pub use pivot_widget::{PivotWidget, PivotWidgetView, WidgetError, WidgetOptions};

//! Pivot associations between admin objects.
//!
//! Join records link one source object to ordered target objects of one
//! type. This crate owns storage, the association use-cases, the admin
//! action envelopes and the widget state models.

pub mod action;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod widget;

pub use action::{ActionResponse, Feedback, FeedbackLevel, PivotActions};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::metadata::{MetadataDocument, ModelMetadata, PivotableObject};
pub use model::object::{ObjectId, ObjectRef, ObjectType, ObjectTypeError, StoredObject};
pub use model::pivot::{Pivot, PivotId, PivotValidationError};
pub use repo::object_repo::{ObjectRepoError, ObjectRepository, SqliteObjectRepository};
pub use repo::pivot_repo::{
    PivotRepoError, PivotRepository, PivotedObject, SqlitePivotRepository,
};
pub use service::pivot_service::{
    PivotEntry, PivotErrorKind, PivotService, PivotServiceError, RemoveMode, RemoveOutcome,
};
pub use service::registry::{ObjectRegistry, PostPivotSave};
pub use widget::{PivotListState, PivotWidget, PivotWidgetView};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

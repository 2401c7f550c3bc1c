//! Domain model for pivot associations.
//!
//! # Responsibility
//! - Define the join record (`Pivot`) and the identity of the objects it links.
//! - Define per-type metadata that drives pivotable target configuration.
//!
//! # Invariants
//! - Every object is addressed by one (`ObjectType`, `ObjectId`) pair.
//! - Pivots reference objects by identity only; they never own them.

pub mod metadata;
pub mod object;
pub mod pivot;

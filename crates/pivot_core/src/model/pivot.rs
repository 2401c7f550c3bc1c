//! Pivot join record.
//!
//! # Responsibility
//! - Represent one source <-> target association row.
//! - Validate row-level invariants before persistence.
//!
//! # Invariants
//! - A pivot references exactly one source pair and one target pair.
//! - `position >= 0`; it only orders pivots sharing source and target type.
//! - Uniqueness of (source, target) is not enforced here.

use crate::model::object::{ObjectId, ObjectRef, ObjectType};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable pivot identifier.
pub type PivotId = Uuid;

/// Validation errors for pivot write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PivotValidationError {
    /// Nil UUID is reserved and cannot identify a pivot.
    NilId,
    /// Position must be zero or greater.
    NegativePosition(i64),
}

impl Display for PivotValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "pivot id must not be nil"),
            Self::NegativePosition(value) => {
                write!(f, "pivot position must be >= 0, got {value}")
            }
        }
    }
}

impl Error for PivotValidationError {}

/// One association row between a source and a target object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pivot {
    pub id: PivotId,
    pub source_object_type: ObjectType,
    pub source_object_id: ObjectId,
    pub target_object_type: ObjectType,
    pub target_object_id: ObjectId,
    /// Order among pivots of the same source and target type.
    pub position: i64,
    pub active: bool,
}

impl Pivot {
    /// Creates an active pivot with a generated id.
    pub fn new(source: &ObjectRef, target: &ObjectRef, position: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_object_type: source.obj_type.clone(),
            source_object_id: source.id.clone(),
            target_object_type: target.obj_type.clone(),
            target_object_id: target.id.clone(),
            position,
            active: true,
        }
    }

    pub fn source(&self) -> ObjectRef {
        ObjectRef::new(self.source_object_type.clone(), self.source_object_id.clone())
    }

    pub fn target(&self) -> ObjectRef {
        ObjectRef::new(self.target_object_type.clone(), self.target_object_id.clone())
    }

    /// Checks row invariants. Write paths call this before any SQL.
    pub fn validate(&self) -> Result<(), PivotValidationError> {
        if self.id.is_nil() {
            return Err(PivotValidationError::NilId);
        }
        if self.position < 0 {
            return Err(PivotValidationError::NegativePosition(self.position));
        }
        Ok(())
    }
}

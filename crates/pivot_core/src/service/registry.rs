//! Known object types, their metadata and post-pivot-save hooks.
//!
//! # Responsibility
//! - Decide whether an object type is known to the admin.
//! - Hold per-type hooks invoked after a pivot to a target is created.
//!
//! # Invariants
//! - Every pivotable target declared in metadata is itself a known type.

use crate::model::metadata::{MetadataDocument, ModelMetadata};
use crate::model::object::{ObjectType, ObjectTypeError, StoredObject};
use crate::model::pivot::Pivot;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Hook implemented by target types that react to being pivoted upon.
pub trait PostPivotSave: Send + Sync {
    /// Called after `pivot` referencing `target` was persisted.
    ///
    /// Returning `false` is logged but does not undo the pivot.
    fn post_pivot_save(&self, pivot: &Pivot, target: &StoredObject) -> bool;
}

/// Registry of object types known to the admin.
#[derive(Default, Clone)]
pub struct ObjectRegistry {
    types: BTreeMap<ObjectType, ModelMetadata>,
    hooks: HashMap<ObjectType, Arc<dyn PostPivotSave>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a metadata document.
    ///
    /// Types only referenced as pivotable targets are registered with empty
    /// metadata.
    pub fn from_metadata(document: &MetadataDocument) -> Result<Self, ObjectTypeError> {
        let mut registry = Self::new();
        for (key, metadata) in &document.types {
            registry.register(ObjectType::parse(key)?, metadata.clone());
        }
        for metadata in document.types.values() {
            for pivotable in metadata.pivots.pivotable_objects()? {
                registry
                    .types
                    .entry(pivotable.pivot_type)
                    .or_insert_with(ModelMetadata::default);
            }
        }
        Ok(registry)
    }

    /// Registers or replaces one type.
    pub fn register(&mut self, obj_type: ObjectType, metadata: ModelMetadata) -> &mut Self {
        self.types.insert(obj_type, metadata);
        self
    }

    /// Attaches a post-pivot-save hook to a type, registering it if needed.
    pub fn register_hook(
        &mut self,
        obj_type: ObjectType,
        hook: Arc<dyn PostPivotSave>,
    ) -> &mut Self {
        self.types.entry(obj_type.clone()).or_default();
        self.hooks.insert(obj_type, hook);
        self
    }

    pub fn is_known(&self, obj_type: &ObjectType) -> bool {
        self.types.contains_key(obj_type)
    }

    pub fn metadata(&self, obj_type: &ObjectType) -> Option<&ModelMetadata> {
        self.types.get(obj_type)
    }

    pub fn hook(&self, obj_type: &ObjectType) -> Option<&dyn PostPivotSave> {
        self.hooks.get(obj_type).map(|hook| hook.as_ref())
    }

    pub fn known_types(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.keys()
    }
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

//! Per-type model metadata and pivot configuration.
//!
//! # Responsibility
//! - Describe which target types a container type accepts as pivots.
//! - Carry labels used by the admin widget.
//!
//! # Invariants
//! - Entries with `active: false` are never listed as pivotable.
//! - `pivot_type` overrides the configuration key when present.

use crate::model::object::{ObjectType, ObjectTypeError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata document keyed by object type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(default)]
    pub types: BTreeMap<String, ModelMetadata>,
}

impl MetadataDocument {
    pub fn from_json_str(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }
}

/// Metadata for one object type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub label: Option<String>,
    /// Title of the "create new item" dialog for this type.
    #[serde(default)]
    pub create_item_label: Option<String>,
    #[serde(default)]
    pub pivots: PivotConfig,
}

/// Container-side pivot configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotConfig {
    #[serde(default)]
    pub pivotable_objects: BTreeMap<String, PivotableObjectMeta>,
}

/// Raw configuration entry for one pivotable target type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotableObjectMeta {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub pivot_type: Option<String>,
}

/// Resolved pivotable target type, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotableObject {
    pub pivot_type: ObjectType,
    pub label: String,
}

impl PivotConfig {
    /// Resolves active entries, applying `pivot_type` overrides and default labels.
    pub fn pivotable_objects(&self) -> Result<Vec<PivotableObject>, ObjectTypeError> {
        let mut resolved = Vec::new();
        for (key, meta) in &self.pivotable_objects {
            if meta.active == Some(false) {
                continue;
            }

            let pivot_type = ObjectType::parse(meta.pivot_type.as_deref().unwrap_or(key))?;
            let label = match meta.label.as_deref().map(str::trim) {
                Some(label) if !label.is_empty() => label.to_string(),
                _ => pivot_type.default_label(),
            };
            resolved.push(PivotableObject { pivot_type, label });
        }
        Ok(resolved)
    }

    /// Returns whether `target_type` is an active pivotable entry.
    pub fn accepts(&self, target_type: &ObjectType) -> bool {
        self.pivotable_objects()
            .map(|items| items.iter().any(|item| &item.pivot_type == target_type))
            .unwrap_or(false)
    }
}

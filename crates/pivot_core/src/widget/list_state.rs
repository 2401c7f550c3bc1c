//! Client-side sortable pivot list and its save round-trip.

use crate::action::{ActionResponse, CreateRequest, RawPivotEntry, RemoveRequest};
use crate::model::object::{ObjectId, ObjectRef, ObjectType};
use crate::model::pivot::PivotId;
use crate::repo::pivot_repo::PivotedObject;
use crate::service::pivot_service::RemoveMode;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from local list edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStateError {
    IndexOutOfRange { index: usize, len: usize },
}

impl Display for ListStateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "list index {index} out of range for {len} entries")
            }
        }
    }
}

impl Error for ListStateError {}

/// One entry of the sortable list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotListEntry {
    /// `None` until the entry has been saved.
    pub pivot_id: Option<PivotId>,
    pub target_object_id: ObjectId,
}

/// Ordered pivot entries plus a dirty flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotListState {
    source: ObjectRef,
    target_type: ObjectType,
    entries: Vec<PivotListEntry>,
    dirty: bool,
}

impl PivotListState {
    pub fn new(source: ObjectRef, target_type: ObjectType) -> Self {
        Self {
            source,
            target_type,
            entries: Vec::new(),
            dirty: false,
        }
    }

    /// Builds a clean list from loaded pivots.
    pub fn from_loaded(
        source: ObjectRef,
        target_type: ObjectType,
        loaded: &[PivotedObject],
    ) -> Self {
        let mut state = Self::new(source, target_type);
        state.reload(loaded);
        state
    }

    pub fn entries(&self) -> &[PivotListEntry] {
        &self.entries
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Appends a target picked or created in the dialog.
    pub fn add(&mut self, target_object_id: ObjectId) {
        self.entries.push(PivotListEntry {
            pivot_id: None,
            target_object_id,
        });
        self.dirty = true;
    }

    /// Moves one entry, as a drag-and-drop drop does.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), ListStateError> {
        let len = self.entries.len();
        if from >= len {
            return Err(ListStateError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(ListStateError::IndexOutOfRange { index: to, len });
        }
        if from == to {
            return Ok(());
        }

        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        self.dirty = true;
        Ok(())
    }

    /// Drops one entry locally, without calling the server.
    pub fn remove_local(&mut self, index: usize) -> Result<PivotListEntry, ListStateError> {
        let len = self.entries.len();
        if index >= len {
            return Err(ListStateError::IndexOutOfRange { index, len });
        }
        self.dirty = true;
        Ok(self.entries.remove(index))
    }

    /// Serializes the current order; `position` is the list index.
    pub fn to_create_request(&self) -> CreateRequest {
        CreateRequest {
            obj_type: Some(self.source.obj_type.to_string()),
            obj_id: Some(Value::String(self.source.id.to_string())),
            target_object_type: Some(self.target_type.to_string()),
            pivots: Some(
                self.entries
                    .iter()
                    .enumerate()
                    .map(|(index, entry)| RawPivotEntry {
                        target_object_id: Some(Value::String(entry.target_object_id.to_string())),
                        position: Some(Value::from(index as i64)),
                    })
                    .collect(),
            ),
        }
    }

    /// Request to send on save, `None` when there is nothing to save.
    pub fn pending_save(&self) -> Option<CreateRequest> {
        (self.dirty && !self.entries.is_empty()).then(|| self.to_create_request())
    }

    /// Builds the remove request for a saved entry after user confirmation.
    ///
    /// `None` for entries that were never saved; drop those with
    /// `remove_local` instead.
    pub fn remove_request(&self, index: usize, mode: RemoveMode) -> Option<RemoveRequest> {
        let pivot_id = self.entries.get(index)?.pivot_id?;
        Some(RemoveRequest {
            pivot_id: Some(Value::String(pivot_id.to_string())),
            delete_obj: Some(Value::Bool(mode.deletes_target())),
        })
    }

    /// Applies a Create/Remove response. Returns whether the list is clean.
    ///
    /// On success, saved pivot ids are adopted in order and the dirty flag
    /// is cleared; on failure the local state is left untouched.
    pub fn mark_synced(&mut self, response: &ActionResponse) -> bool {
        if !response.success {
            return false;
        }
        if response.pivots.len() == self.entries.len() {
            for (entry, pivot) in self.entries.iter_mut().zip(&response.pivots) {
                if entry.target_object_id == pivot.target_object_id {
                    entry.pivot_id = Some(pivot.id);
                }
            }
        }
        self.dirty = false;
        true
    }

    /// Replaces entries with freshly loaded pivots and clears the dirty flag.
    pub fn reload(&mut self, loaded: &[PivotedObject]) {
        self.entries = loaded
            .iter()
            .map(|item| PivotListEntry {
                pivot_id: Some(item.pivot_id),
                target_object_id: item.object.id.clone(),
            })
            .collect();
        self.dirty = false;
    }
}

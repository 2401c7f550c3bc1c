//! Pivot association use-case service.
//!
//! # Responsibility
//! - Implement list / replace-all / append / remove over pivot rows.
//! - Resolve sources and targets through the object store.
//!
//! # Invariants
//! - Source and target types must be registered in `ObjectRegistry`.
//! - Replace-all and append fail without writes when the source cannot be loaded.
//! - Positions come from the write request; deletes never renumber.

use crate::model::object::{ObjectId, ObjectRef, ObjectType, StoredObject};
use crate::model::pivot::{Pivot, PivotId, PivotValidationError};
use crate::repo::object_repo::{ObjectRepoError, ObjectRepository};
use crate::repo::pivot_repo::{PivotRepoError, PivotRepository, PivotedObject};
use crate::service::registry::ObjectRegistry;
use log::{info, warn};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Broad failure class, used to pick feedback and status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotErrorKind {
    Validation,
    NotFound,
    MissingStorage,
    Storage,
}

/// Errors from pivot service operations.
#[derive(Debug)]
pub enum PivotServiceError {
    /// Object type is not registered.
    UnknownObjectType(ObjectType),
    /// Write request carried no pivot entries.
    EmptyPivots,
    /// Pivot entry failed row validation.
    InvalidPivot(PivotValidationError),
    /// Source object cannot be loaded.
    SourceNotFound(ObjectRef),
    /// Pivot row does not exist.
    PivotNotFound(PivotId),
    /// Target object row does not exist.
    TargetNotFound(ObjectRef),
    /// Join table has not been provisioned.
    MissingPivotTable,
    /// Object table for a type has not been provisioned.
    MissingObjectTable(ObjectType),
    /// Pivot repository failure.
    Repo(PivotRepoError),
    /// Object store failure.
    Objects(ObjectRepoError),
}

impl PivotServiceError {
    pub fn kind(&self) -> PivotErrorKind {
        match self {
            Self::UnknownObjectType(_) | Self::EmptyPivots | Self::InvalidPivot(_) => {
                PivotErrorKind::Validation
            }
            Self::SourceNotFound(_) | Self::PivotNotFound(_) | Self::TargetNotFound(_) => {
                PivotErrorKind::NotFound
            }
            Self::MissingPivotTable | Self::MissingObjectTable(_) => {
                PivotErrorKind::MissingStorage
            }
            Self::Repo(_) | Self::Objects(_) => PivotErrorKind::Storage,
        }
    }
}

impl Display for PivotServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownObjectType(obj_type) => write!(f, "unknown object type `{obj_type}`"),
            Self::EmptyPivots => write!(f, "at least one pivot entry is required"),
            Self::InvalidPivot(err) => write!(f, "{err}"),
            Self::SourceNotFound(source) => write!(f, "source object not found: {source}"),
            Self::PivotNotFound(id) => write!(f, "pivot not found: {id}"),
            Self::TargetNotFound(target) => write!(f, "target object not found: {target}"),
            Self::MissingPivotTable => write!(f, "pivot table does not exist"),
            Self::MissingObjectTable(obj_type) => {
                write!(f, "storage table for object type `{obj_type}` does not exist")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::Objects(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PivotServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPivot(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Objects(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PivotRepoError> for PivotServiceError {
    fn from(value: PivotRepoError) -> Self {
        match value {
            PivotRepoError::NotFound(id) => Self::PivotNotFound(id),
            PivotRepoError::MissingTable => Self::MissingPivotTable,
            PivotRepoError::Validation(err) => Self::InvalidPivot(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ObjectRepoError> for PivotServiceError {
    fn from(value: ObjectRepoError) -> Self {
        match value {
            ObjectRepoError::NotFound(target) => Self::TargetNotFound(target),
            ObjectRepoError::MissingTable(obj_type) => Self::MissingObjectTable(obj_type),
            other => Self::Objects(other),
        }
    }
}

/// One ordered entry of a replace-all request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PivotEntry {
    pub target_object_id: ObjectId,
    /// Explicit position; defaults to the entry index.
    #[serde(default)]
    pub position: Option<i64>,
}

impl PivotEntry {
    pub fn new(target_object_id: ObjectId) -> Self {
        Self {
            target_object_id,
            position: None,
        }
    }
}

/// What happens to the target object when its pivot is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveMode {
    /// Delete the pivot row only.
    DetachOnly,
    /// Delete the target object, then the pivot row.
    DeleteTarget,
}

impl RemoveMode {
    pub fn from_delete_obj(delete_obj: bool) -> Self {
        if delete_obj {
            Self::DeleteTarget
        } else {
            Self::DetachOnly
        }
    }

    pub fn deletes_target(self) -> bool {
        matches!(self, Self::DeleteTarget)
    }
}

/// Result of a successful remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub pivot: Pivot,
    pub target_deleted: bool,
}

/// Pivot protocol facade over a pivot repository and an object store.
pub struct PivotService<'reg, P: PivotRepository, O: ObjectRepository> {
    pivots: P,
    objects: O,
    registry: &'reg ObjectRegistry,
}

impl<'reg, P: PivotRepository, O: ObjectRepository> PivotService<'reg, P, O> {
    pub fn new(pivots: P, objects: O, registry: &'reg ObjectRegistry) -> Self {
        Self {
            pivots,
            objects,
            registry,
        }
    }

    pub fn registry(&self) -> &ObjectRegistry {
        self.registry
    }

    /// Lists active targets of `source` for `target_type`, ordered by position.
    ///
    /// Empty when the join table or the target table does not exist yet.
    pub fn list_pivots(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
    ) -> Result<Vec<PivotedObject>, PivotServiceError> {
        self.ensure_known(&source.obj_type)?;
        self.ensure_known(target_type)?;
        Ok(self.pivots.list_targets(source, target_type)?)
    }

    /// Lists active sources of `source_type` that reference `target`.
    pub fn list_sources(
        &self,
        target: &ObjectRef,
        source_type: &ObjectType,
    ) -> Result<Vec<PivotedObject>, PivotServiceError> {
        self.ensure_known(&target.obj_type)?;
        self.ensure_known(source_type)?;
        Ok(self.pivots.list_sources(target, source_type)?)
    }

    /// Counts the active targets `list_pivots` would return.
    ///
    /// Rows whose target is inactive or missing are not counted.
    pub fn num_pivots(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
    ) -> Result<usize, PivotServiceError> {
        Ok(self.pivots.list_targets(source, target_type)?.len())
    }

    pub fn has_pivots(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
    ) -> Result<bool, PivotServiceError> {
        Ok(self.num_pivots(source, target_type)? > 0)
    }

    /// Replaces every pivot of (`source`, `target_type`) with `entries`.
    ///
    /// Entry `i` gets `position = entry.position.unwrap_or(i)`.
    pub fn replace_all(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
        entries: &[PivotEntry],
    ) -> Result<Vec<Pivot>, PivotServiceError> {
        self.ensure_known(&source.obj_type)?;
        self.ensure_known(target_type)?;
        if entries.is_empty() {
            return Err(PivotServiceError::EmptyPivots);
        }
        self.ensure_source_loadable(source)?;

        let pivots = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let target = ObjectRef::new(target_type.clone(), entry.target_object_id.clone());
                let pivot = Pivot::new(source, &target, entry.position.unwrap_or(index as i64));
                pivot.validate().map(|()| pivot)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(PivotServiceError::InvalidPivot)?;

        self.pivots.replace_pivots(source, target_type, &pivots)?;
        info!(
            "event=pivot_replace module=pivot status=ok source={} target_type={} count={}",
            source,
            target_type,
            pivots.len()
        );

        for pivot in &pivots {
            self.run_post_pivot_save(pivot);
        }
        Ok(pivots)
    }

    /// Appends one target after the existing pivots (`position = count`).
    pub fn append(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
        target_id: ObjectId,
    ) -> Result<Pivot, PivotServiceError> {
        let mut created = self.append_many(source, target_type, &[target_id])?;
        created.pop().ok_or(PivotServiceError::EmptyPivots)
    }

    /// Appends targets in order, starting at `count(existing)`.
    pub fn append_many(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
        target_ids: &[ObjectId],
    ) -> Result<Vec<Pivot>, PivotServiceError> {
        self.ensure_known(&source.obj_type)?;
        self.ensure_known(target_type)?;
        if target_ids.is_empty() {
            return Err(PivotServiceError::EmptyPivots);
        }
        self.ensure_source_loadable(source)?;

        let created = self.pivots.append_pivots(source, target_type, target_ids)?;
        info!(
            "event=pivot_append module=pivot status=ok source={} target_type={} count={}",
            source,
            target_type,
            created.len()
        );

        for pivot in &created {
            self.run_post_pivot_save(pivot);
        }
        Ok(created)
    }

    /// Removes one pivot, optionally deleting its target first.
    pub fn remove(
        &self,
        pivot_id: PivotId,
        mode: RemoveMode,
    ) -> Result<RemoveOutcome, PivotServiceError> {
        if !self.pivots.table_exists()? {
            return Err(PivotServiceError::MissingPivotTable);
        }
        let pivot = self
            .pivots
            .get_pivot(pivot_id)?
            .ok_or(PivotServiceError::PivotNotFound(pivot_id))?;

        let mut target_deleted = false;
        if mode.deletes_target() {
            let target = pivot.target();
            self.objects
                .load_object(&target)?
                .ok_or_else(|| PivotServiceError::TargetNotFound(target.clone()))?;
            self.objects.delete_object(&target)?;
            target_deleted = true;
        }

        self.pivots.delete_pivot(pivot_id)?;
        info!(
            "event=pivot_remove module=pivot status=ok pivot_id={} target_deleted={}",
            pivot_id, target_deleted
        );
        Ok(RemoveOutcome {
            pivot,
            target_deleted,
        })
    }

    /// Removes every pivot matching the full (source, target) tuple.
    ///
    /// Both types must be registered and the source must load.
    pub fn remove_by_pair(
        &self,
        source: &ObjectRef,
        target: &ObjectRef,
    ) -> Result<usize, PivotServiceError> {
        self.ensure_known(&source.obj_type)?;
        self.ensure_known(&target.obj_type)?;
        self.ensure_source_loadable(source)?;

        let removed = self.pivots.delete_matching(source, target)?;
        info!(
            "event=pivot_remove_pair module=pivot status=ok source={} target={} removed={}",
            source, target, removed
        );
        Ok(removed)
    }

    /// Detaches every child relationship of `source`.
    pub fn remove_child_joins(&self, source: &ObjectRef) -> Result<usize, PivotServiceError> {
        Ok(self.pivots.delete_for_source(source)?)
    }

    /// Detaches every parent relationship of `target`.
    pub fn remove_parent_joins(&self, target: &ObjectRef) -> Result<usize, PivotServiceError> {
        Ok(self.pivots.delete_for_target(target)?)
    }

    /// Loads one object, `None` when its row or table is missing.
    pub fn find_object(
        &self,
        object: &ObjectRef,
    ) -> Result<Option<StoredObject>, PivotServiceError> {
        match self.objects.load_object(object) {
            Ok(found) => Ok(found),
            Err(ObjectRepoError::MissingTable(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn ensure_known(&self, obj_type: &ObjectType) -> Result<(), PivotServiceError> {
        if !self.registry.is_known(obj_type) {
            return Err(PivotServiceError::UnknownObjectType(obj_type.clone()));
        }
        Ok(())
    }

    fn ensure_source_loadable(&self, source: &ObjectRef) -> Result<(), PivotServiceError> {
        match self.find_object(source)? {
            Some(_) => Ok(()),
            None => Err(PivotServiceError::SourceNotFound(source.clone())),
        }
    }

    fn run_post_pivot_save(&self, pivot: &Pivot) {
        let Some(hook) = self.registry.hook(&pivot.target_object_type) else {
            return;
        };

        let target = pivot.target();
        match self.find_object(&target) {
            Ok(Some(object)) => {
                if !hook.post_pivot_save(pivot, &object) {
                    warn!(
                        "event=post_pivot_save module=pivot status=error pivot_id={} target={}",
                        pivot.id, target
                    );
                }
            }
            Ok(None) => warn!(
                "event=post_pivot_save module=pivot status=skipped reason=target_missing pivot_id={} target={}",
                pivot.id, target
            ),
            Err(err) => warn!(
                "event=post_pivot_save module=pivot status=error pivot_id={} target={} error={}",
                pivot.id, target, err
            ),
        }
    }
}

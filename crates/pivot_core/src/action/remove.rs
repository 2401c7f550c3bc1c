//! Remove actions: detach one pivot by id, or every pivot of a full pair.

use super::{
    boolean_param, parse_object_param, scalar_param, ActionResponse, FeedbackLevel,
    PivotActions, STATUS_NOT_FOUND,
};
use crate::model::object::ObjectRef;
use crate::service::pivot_service::RemoveMode;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

/// Body of `POST pivot/remove`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoveRequest {
    pub pivot_id: Option<Value>,
    /// Boolean-like; when true the target object is deleted too.
    #[serde(default)]
    pub delete_obj: Option<Value>,
}

/// Body of `POST pivot/remove-pair`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemovePairRequest {
    pub source_obj_type: Option<String>,
    pub source_obj_id: Option<Value>,
    pub target_object_type: Option<String>,
    pub target_object_id: Option<Value>,
}

impl PivotActions<'_> {
    /// Detaches one pivot, optionally deleting its target object.
    ///
    /// Status: 400 missing id, 418 missing table, 404 unknown pivot or
    /// target, 200 on success.
    pub fn remove(&self, request: &RemoveRequest) -> ActionResponse {
        let Some(raw_id) = scalar_param(request.pivot_id.as_ref()) else {
            return ActionResponse::invalid("Missing \"pivot_id\" for detaching objects.");
        };
        let mode = RemoveMode::from_delete_obj(boolean_param(request.delete_obj.as_ref()));

        // An id that is not a UUID cannot name a stored pivot.
        let Ok(pivot_id) = Uuid::parse_str(&raw_id) else {
            return ActionResponse::new()
                .feedback(FeedbackLevel::Error, "The relationship cannot be found.")
                .fail(STATUS_NOT_FOUND);
        };

        match self.service().remove(pivot_id, mode) {
            Ok(outcome) => {
                let mut response = ActionResponse::new();
                if outcome.target_deleted {
                    response =
                        response.feedback(FeedbackLevel::Success, "The related object is deleted.");
                }
                response
                    .feedback(FeedbackLevel::Success, "The relationship is detached.")
                    .succeed()
            }
            Err(err) => ActionResponse::from_service_error("remove", &err),
        }
    }

    /// Detaches every pivot matching (source, target) exactly.
    pub fn remove_pair(&self, request: &RemovePairRequest) -> ActionResponse {
        let source = parse_object_param(
            request.source_obj_type.as_deref(),
            request.source_obj_id.as_ref(),
        );
        let target = parse_object_param(
            request.target_object_type.as_deref(),
            request.target_object_id.as_ref(),
        );
        let (Some(source), Some(target)) = (source, target) else {
            return ActionResponse::invalid("Invalid parameters for Pivot.");
        };

        match self.service().remove_by_pair(&source, &target) {
            Ok(0) => not_attached(&source, &target),
            Ok(_) => ActionResponse::new()
                .feedback(FeedbackLevel::Success, "The relationship is detached.")
                .succeed(),
            Err(err) => ActionResponse::from_service_error("remove_pair", &err),
        }
    }
}

fn not_attached(source: &ObjectRef, target: &ObjectRef) -> ActionResponse {
    ActionResponse::new()
        .feedback(
            FeedbackLevel::Error,
            format!("\"{target}\" is not attached to \"{source}\"."),
        )
        .fail(STATUS_NOT_FOUND)
}

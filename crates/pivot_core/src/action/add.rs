//! Add action: append targets to a source without clearing existing pivots.

use super::{
    parse_object_param, parse_type_param, scalar_param, ActionResponse, FeedbackLevel,
    PivotActions,
};
use crate::model::object::ObjectId;
use log::info;
use serde::Deserialize;
use serde_json::Value;

/// Body of `POST pivot/add`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddRequest {
    pub source_obj_type: Option<String>,
    pub source_obj_id: Option<Value>,
    pub target_object_type: Option<String>,
    pub pivots: Option<Vec<RawTargetEntry>>,
}

/// One target to append.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTargetEntry {
    pub target_object_id: Option<Value>,
}

impl PivotActions<'_> {
    /// Appends each target after the existing pivots, in request order.
    pub fn add(&self, request: &AddRequest) -> ActionResponse {
        let source = parse_object_param(
            request.source_obj_type.as_deref(),
            request.source_obj_id.as_ref(),
        );
        let target_type = parse_type_param(request.target_object_type.as_deref());
        let (Some(source), Some(target_type), Some(raw_entries)) =
            (source, target_type, request.pivots.as_ref())
        else {
            return ActionResponse::invalid("Invalid parameters for Pivot.");
        };

        if raw_entries.is_empty() {
            return ActionResponse::invalid("At least one pivot is required.");
        }

        let target_ids = raw_entries
            .iter()
            .map(|raw| {
                scalar_param(raw.target_object_id.as_ref())
                    .and_then(|value| ObjectId::parse(value).ok())
            })
            .collect::<Option<Vec<_>>>();
        let Some(target_ids) = target_ids else {
            return ActionResponse::invalid("Invalid pivot entries.");
        };

        match self.service().append_many(&source, &target_type, &target_ids) {
            Ok(pivots) => {
                info!(
                    "event=pivot_action module=action status=ok action=add source={} target_type={} count={}",
                    source,
                    target_type,
                    pivots.len()
                );
                let mut response = ActionResponse::new()
                    .feedback(FeedbackLevel::Success, "The relationships are attached.")
                    .succeed();
                response.pivots = pivots;
                response
            }
            Err(err) => ActionResponse::from_service_error("add", &err),
        }
    }
}

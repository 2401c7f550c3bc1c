//! Create action: replace every pivot of one (source, target type) pair.

use super::{
    integer_param, parse_object_param, parse_type_param, scalar_param, ActionResponse,
    FeedbackLevel, PivotActions,
};
use crate::model::object::ObjectId;
use crate::service::pivot_service::PivotEntry;
use log::info;
use serde::Deserialize;
use serde_json::Value;

/// Body of `POST pivot/create`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRequest {
    pub obj_type: Option<String>,
    pub obj_id: Option<Value>,
    pub target_object_type: Option<String>,
    pub pivots: Option<Vec<RawPivotEntry>>,
}

/// One ordered entry as posted by the reordering UI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPivotEntry {
    pub target_object_id: Option<Value>,
    #[serde(default)]
    pub position: Option<Value>,
}

impl PivotActions<'_> {
    /// Replaces the full ordered pivot set for a source and target type.
    pub fn create(&self, request: &CreateRequest) -> ActionResponse {
        let source = parse_object_param(request.obj_type.as_deref(), request.obj_id.as_ref());
        let target_type = parse_type_param(request.target_object_type.as_deref());
        let (Some(source), Some(target_type), Some(raw_entries)) =
            (source, target_type, request.pivots.as_ref())
        else {
            return ActionResponse::invalid("Invalid parameters for Pivot.");
        };

        if raw_entries.is_empty() {
            return ActionResponse::invalid("At least one pivot is required.");
        }

        let Some(entries) = parse_entries(raw_entries) else {
            return ActionResponse::invalid("Invalid pivot entries.");
        };

        match self.service().replace_all(&source, &target_type, &entries) {
            Ok(pivots) => {
                info!(
                    "event=pivot_action module=action status=ok action=create source={} target_type={} count={}",
                    source,
                    target_type,
                    pivots.len()
                );
                let mut response = ActionResponse::new()
                    .feedback(FeedbackLevel::Success, "The relationships are saved.")
                    .succeed();
                response.pivots = pivots;
                response
            }
            Err(err) => ActionResponse::from_service_error("create", &err),
        }
    }
}

fn parse_entries(raw_entries: &[RawPivotEntry]) -> Option<Vec<PivotEntry>> {
    raw_entries
        .iter()
        .map(|raw| {
            let target_object_id = ObjectId::parse(scalar_param(raw.target_object_id.as_ref())?).ok()?;
            let position = match raw.position.as_ref() {
                None | Some(Value::Null) => None,
                Some(value) => Some(integer_param(value)?),
            };
            Some(PivotEntry {
                target_object_id,
                position,
            })
        })
        .collect()
}

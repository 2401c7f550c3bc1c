//! Object save action: upsert one container or target object.

use super::{
    boolean_param, scalar_param, text_param, ActionResponse, FeedbackLevel, PivotActions,
    STATUS_STORAGE_ERROR,
};
use crate::model::object::{ObjectId, ObjectType, StoredObject};
use crate::repo::object_repo::{ObjectRepository, SqliteObjectRepository};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

/// Body of `POST object/save`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveObjectRequest {
    pub obj_type: Option<String>,
    pub id: Option<Value>,
    /// Boolean-like; defaults to active.
    #[serde(default)]
    pub active: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl PivotActions<'_> {
    /// Creates or updates one object of a registered type.
    pub fn save_object(&self, request: &SaveObjectRequest) -> ActionResponse {
        let obj_type = text_param(request.obj_type.as_deref())
            .and_then(|value| ObjectType::parse(value).ok());
        let id = scalar_param(request.id.as_ref()).and_then(|value| ObjectId::parse(value).ok());
        let (Some(obj_type), Some(id)) = (obj_type, id) else {
            return ActionResponse::invalid("Invalid parameters for object.");
        };
        if !self.registry.is_known(&obj_type) {
            return ActionResponse::invalid(format!("Unknown object type \"{obj_type}\"."));
        }

        let data = match request.data.clone() {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(data @ Value::Object(_)) => data,
            Some(_) => return ActionResponse::invalid("Object data must be a JSON object."),
        };
        let mut object = StoredObject::new(obj_type, id).with_data(data);
        if request.active.is_some() {
            object.active = boolean_param(request.active.as_ref());
        }

        match SqliteObjectRepository::new(self.conn).save_object(&object) {
            Ok(()) => {
                info!(
                    "event=object_save module=action status=ok object={}",
                    object.object_ref()
                );
                ActionResponse::new()
                    .feedback(FeedbackLevel::Success, "The object is saved.")
                    .succeed()
            }
            Err(err) => {
                warn!(
                    "event=object_save module=action status=error object={} error={}",
                    object.object_ref(),
                    err
                );
                ActionResponse::new()
                    .feedback(FeedbackLevel::Error, "The object could not be saved.")
                    .fail(STATUS_STORAGE_ERROR)
            }
        }
    }
}

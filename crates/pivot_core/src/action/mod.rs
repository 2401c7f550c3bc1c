//! Request handlers for the pivot admin actions.
//!
//! # Responsibility
//! - Validate raw request parameters before any storage access.
//! - Run one pivot use-case per request and answer a feedback envelope.
//!
//! # Invariants
//! - Handlers never panic and never return `Err`; every failure becomes
//!   `success=false` plus user-facing feedback and a status code.
//! - Validation failures perform no writes.

mod add;
mod create;
mod object;
mod read;
mod remove;

pub use add::{AddRequest, RawTargetEntry};
pub use create::{CreateRequest, RawPivotEntry};
pub use object::SaveObjectRequest;
pub use read::{BelongsToRequest, ListRequest, WidgetRequest};
pub use remove::{RemovePairRequest, RemoveRequest};

use crate::model::object::{ObjectId, ObjectRef, ObjectType};
use crate::model::pivot::Pivot;
use crate::repo::object_repo::SqliteObjectRepository;
use crate::repo::pivot_repo::{PivotedObject, SqlitePivotRepository};
use crate::service::pivot_service::{PivotErrorKind, PivotService, PivotServiceError};
use crate::service::registry::ObjectRegistry;
use crate::widget::PivotWidgetView;
use log::warn;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
/// Backing table not provisioned yet.
pub const STATUS_MISSING_STORAGE: u16 = 418;
pub const STATUS_STORAGE_ERROR: u16 = 500;

/// Feedback severity shown by the admin toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// One user-facing feedback message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub level: FeedbackLevel,
    pub msg: String,
}

/// Response envelope shared by all pivot actions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub feedbacks: Vec<Feedback>,
    /// Pivots written by the action, in stored order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pivots: Vec<Pivot>,
    /// Objects reached through pivots, for read actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<PivotedObject>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<PivotWidgetView>,
    /// HTTP status to answer with.
    #[serde(skip)]
    pub status: u16,
}

impl ActionResponse {
    fn new() -> Self {
        Self {
            success: false,
            feedbacks: Vec::new(),
            pivots: Vec::new(),
            items: None,
            widget: None,
            status: STATUS_OK,
        }
    }

    fn feedback(mut self, level: FeedbackLevel, msg: impl Into<String>) -> Self {
        self.feedbacks.push(Feedback {
            level,
            msg: msg.into(),
        });
        self
    }

    fn succeed(mut self) -> Self {
        self.success = true;
        self.status = STATUS_OK;
        self
    }

    fn fail(mut self, status: u16) -> Self {
        self.success = false;
        self.status = status;
        self
    }

    /// Validation failure with one error feedback and status 400.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new()
            .feedback(FeedbackLevel::Error, msg)
            .fail(STATUS_BAD_REQUEST)
    }

    /// Maps a service failure onto feedback and status.
    fn from_service_error(action: &str, err: &PivotServiceError) -> Self {
        warn!(
            "event=pivot_action module=action status=error action={} error={}",
            action, err
        );
        let (level, status) = match err.kind() {
            PivotErrorKind::Validation => (FeedbackLevel::Error, STATUS_BAD_REQUEST),
            PivotErrorKind::NotFound => (FeedbackLevel::Error, STATUS_NOT_FOUND),
            PivotErrorKind::MissingStorage => (FeedbackLevel::Warning, STATUS_MISSING_STORAGE),
            PivotErrorKind::Storage => (FeedbackLevel::Error, STATUS_STORAGE_ERROR),
        };
        Self::new().feedback(level, user_message(err)).fail(status)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

fn user_message(err: &PivotServiceError) -> String {
    match err {
        PivotServiceError::UnknownObjectType(obj_type) => {
            format!("Unknown object type \"{obj_type}\".")
        }
        PivotServiceError::EmptyPivots => "At least one pivot is required.".to_string(),
        PivotServiceError::InvalidPivot(err) => format!("Invalid pivot: {err}."),
        PivotServiceError::SourceNotFound(source) => {
            format!("The source object \"{source}\" cannot be found.")
        }
        PivotServiceError::PivotNotFound(_) => "The relationship cannot be found.".to_string(),
        PivotServiceError::TargetNotFound(_) => {
            "The related target cannot be found.".to_string()
        }
        PivotServiceError::MissingPivotTable => "Missing relationships table.".to_string(),
        PivotServiceError::MissingObjectTable(_) => "Missing related table.".to_string(),
        PivotServiceError::Repo(_) | PivotServiceError::Objects(_) => {
            "The relationship could not be saved.".to_string()
        }
    }
}

/// Entry point for the pivot actions over one connection.
pub struct PivotActions<'a> {
    conn: &'a Connection,
    registry: &'a ObjectRegistry,
}

impl<'a> PivotActions<'a> {
    pub fn new(conn: &'a Connection, registry: &'a ObjectRegistry) -> Self {
        Self { conn, registry }
    }

    fn service(
        &self,
    ) -> PivotService<'a, SqlitePivotRepository<'a>, SqliteObjectRepository<'a>> {
        PivotService::new(
            SqlitePivotRepository::new(self.conn),
            SqliteObjectRepository::new(self.conn),
            self.registry,
        )
    }
}

/// Reads a scalar id parameter (JSON string or number).
fn scalar_param(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Reads a non-empty string parameter.
fn text_param(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

/// Reads an integer parameter given as number or numeric string.
fn integer_param(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a boolean-like parameter (`true`, `1`, `"yes"`, `"on"`, ...).
///
/// Unrecognized values read as `false`.
pub fn boolean_param(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|value| value == 1.0),
        Some(Value::String(text)) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on" | "yes"
        ),
        _ => false,
    }
}

fn parse_type_param(value: Option<&str>) -> Option<ObjectType> {
    ObjectType::parse(text_param(value)?).ok()
}

fn parse_object_param(obj_type: Option<&str>, obj_id: Option<&Value>) -> Option<ObjectRef> {
    let obj_type = parse_type_param(obj_type)?;
    let obj_id = ObjectId::parse(scalar_param(obj_id)?).ok()?;
    Some(ObjectRef::new(obj_type, obj_id))
}

#[cfg(test)]
mod tests {
    use super::{boolean_param, integer_param, scalar_param};
    use serde_json::json;

    #[test]
    fn boolean_param_follows_form_conventions() {
        for truthy in [json!(true), json!(1), json!("1"), json!("true"), json!(" Yes "), json!("on")] {
            assert!(boolean_param(Some(&truthy)), "{truthy} should be true");
        }
        for falsy in [json!(false), json!(0), json!("0"), json!("off"), json!("nope"), json!(null)] {
            assert!(!boolean_param(Some(&falsy)), "{falsy} should be false");
        }
        assert!(!boolean_param(None));
    }

    #[test]
    fn scalar_param_accepts_strings_and_numbers_only() {
        assert_eq!(scalar_param(Some(&json!(42))), Some("42".to_string()));
        assert_eq!(scalar_param(Some(&json!(" 42 "))), Some("42".to_string()));
        assert_eq!(scalar_param(Some(&json!(""))), None);
        assert_eq!(scalar_param(Some(&json!([1]))), None);
        assert_eq!(scalar_param(None), None);
    }

    #[test]
    fn integer_param_parses_numeric_strings() {
        assert_eq!(integer_param(&json!(3)), Some(3));
        assert_eq!(integer_param(&json!("4")), Some(4));
        assert_eq!(integer_param(&json!("x")), None);
    }
}

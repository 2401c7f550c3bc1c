//! Object identity and storage shape.
//!
//! # Responsibility
//! - Validate object type identifiers and scalar object ids.
//! - Map object types onto storage table names.
//!
//! # Invariants
//! - `ObjectType` always matches `TYPE_PATTERN`, so derived table names are
//!   safe to interpolate into SQL.
//! - `ObjectId` is never empty after trimming.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TYPE_PATTERN: &str = r"^[a-z][a-z0-9_]*(/[a-z][a-z0-9_]*)*$";
const MAX_TYPE_CHARS: usize = 120;

static TYPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(TYPE_PATTERN).expect("valid type regex"));

/// Errors for malformed object identity values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectTypeError {
    /// Type identifier is blank.
    EmptyType,
    /// Type identifier does not match the allowed shape.
    InvalidType(String),
    /// Object id is blank.
    EmptyId,
}

impl Display for ObjectTypeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyType => write!(f, "object type must not be blank"),
            Self::InvalidType(value) => write!(f, "invalid object type `{value}`"),
            Self::EmptyId => write!(f, "object id must not be blank"),
        }
    }
}

impl Error for ObjectTypeError {}

/// Object type identifier, e.g. `article` or `city/object/image`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectType(String);

impl ObjectType {
    /// Parses and validates a type identifier.
    pub fn parse(value: impl AsRef<str>) -> Result<Self, ObjectTypeError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ObjectTypeError::EmptyType);
        }
        if trimmed.len() > MAX_TYPE_CHARS || !TYPE_RE.is_match(trimmed) {
            return Err(ObjectTypeError::InvalidType(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Storage table backing objects of this type.
    pub fn table_name(&self) -> String {
        format!("obj_{}", self.0.replace('/', "__"))
    }

    /// Last path segment of the type, capitalized (`city/object/image` -> `Image`).
    pub fn default_label(&self) -> String {
        let base = self.0.rsplit('/').next().unwrap_or(self.0.as_str());
        let mut chars = base.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ObjectType {
    type Error = ObjectTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ObjectType> for String {
    fn from(value: ObjectType) -> Self {
        value.0
    }
}

/// Scalar object identifier. Accepts JSON strings and integers on input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawObjectId", into = "String")]
pub struct ObjectId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawObjectId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl ObjectId {
    pub fn parse(value: impl AsRef<str>) -> Result<Self, ObjectTypeError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ObjectTypeError::EmptyId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ObjectId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl TryFrom<RawObjectId> for ObjectId {
    type Error = ObjectTypeError;

    fn try_from(value: RawObjectId) -> Result<Self, Self::Error> {
        match value {
            RawObjectId::Text(text) => Self::parse(text),
            RawObjectId::Signed(number) => Ok(Self(number.to_string())),
            RawObjectId::Unsigned(number) => Ok(Self(number.to_string())),
        }
    }
}

impl From<ObjectId> for String {
    fn from(value: ObjectId) -> Self {
        value.0
    }
}

/// One (type, id) pair addressing a persisted object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub obj_type: ObjectType,
    pub id: ObjectId,
}

impl ObjectRef {
    pub fn new(obj_type: ObjectType, id: ObjectId) -> Self {
        Self { obj_type, id }
    }

    /// Parses both parts from raw strings.
    pub fn parse(obj_type: &str, id: &str) -> Result<Self, ObjectTypeError> {
        Ok(Self {
            obj_type: ObjectType::parse(obj_type)?,
            id: ObjectId::parse(id)?,
        })
    }
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.obj_type, self.id)
    }
}

/// Persisted source or target object.
///
/// `data` holds free-form attributes (title, src, ...); pivot logic only
/// looks at identity and `active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub obj_type: ObjectType,
    pub id: ObjectId,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "empty_data")]
    pub data: serde_json::Value,
}

impl StoredObject {
    /// Creates an active object with empty attributes.
    pub fn new(obj_type: ObjectType, id: ObjectId) -> Self {
        Self {
            obj_type,
            id,
            active: true,
            data: empty_data(),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.obj_type.clone(), self.id.clone())
    }
}

fn default_active() -> bool {
    true
}

fn empty_data() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

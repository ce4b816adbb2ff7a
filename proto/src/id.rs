use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::MalformedEvent;

/// Name of the identity field every row must carry
pub const ID_FIELD: &str = "id";

/// Identity of a row. Backends hand out either integer or text keys, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl RowId {
    /// Interpret a JSON value as a row identity
    pub fn from_json(value: &Value) -> Result<Self, MalformedEvent> {
        match value {
            Value::Null => Err(MalformedEvent::MissingId),
            Value::Number(n) => n.as_i64().map(RowId::Int).ok_or_else(|| MalformedEvent::InvalidId(n.to_string())),
            Value::String(s) => Ok(RowId::Text(s.clone())),
            other => Err(MalformedEvent::InvalidId(other.to_string())),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            RowId::Int(i) => Value::from(*i),
            RowId::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(i) => write!(f, "{}", i),
            RowId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self { RowId::Int(id) }
}

impl From<i32> for RowId {
    fn from(id: i32) -> Self { RowId::Int(id as i64) }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self { RowId::Text(id.to_string()) }
}

impl From<String> for RowId {
    fn from(id: String) -> Self { RowId::Text(id) }
}

impl From<&RowId> for RowId {
    fn from(id: &RowId) -> Self { id.clone() }
}

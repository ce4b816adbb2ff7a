use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::{
    error::MalformedEvent,
    id::{RowId, ID_FIELD},
};

/// Name of the creation timestamp field used for snapshot ordering
pub const CREATED_AT_FIELD: &str = "created_at";

/// One remote record: a JSON object with a validated identity.
///
/// Rows are immutable. Changing a field produces a new `Row` (see [`Row::with`]);
/// caches replace whole rows rather than editing them. Cloning is cheap.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Row(Arc<Inner>);

#[derive(PartialEq)]
struct Inner {
    id: RowId,
    fields: Map<String, Value>,
}

impl Row {
    /// Validate a JSON value as a row image
    pub fn new(value: Value) -> Result<Self, MalformedEvent> {
        match value {
            Value::Object(fields) => Self::from_map(fields),
            _ => Err(MalformedEvent::NotAnObject),
        }
    }

    pub fn from_map(fields: Map<String, Value>) -> Result<Self, MalformedEvent> {
        let id = RowId::from_json(fields.get(ID_FIELD).unwrap_or(&Value::Null))?;
        Ok(Row(Arc::new(Inner { id, fields })))
    }

    pub fn id(&self) -> &RowId { &self.0.id }

    pub fn get(&self, field: &str) -> Option<&Value> { self.0.fields.get(field) }

    pub fn fields(&self) -> &Map<String, Value> { &self.0.fields }

    /// Creation time, if the row carries one. Accepts RFC 3339 strings or integer epoch seconds.
    pub fn created_at(&self) -> Option<DateTime<Utc>> { self.get(CREATED_AT_FIELD).and_then(parse_timestamp) }

    /// A new row with one field replaced. The identity field cannot be changed this way.
    pub fn with(&self, field: &str, value: impl Into<Value>) -> Row {
        let mut fields = self.0.fields.clone();
        if field != ID_FIELD {
            fields.insert(field.to_string(), value.into());
        }
        Row(Arc::new(Inner { id: self.0.id.clone(), fields }))
    }

    pub fn to_value(&self) -> Value { Value::Object(self.0.fields.clone()) }
}

pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

impl TryFrom<Value> for Row {
    type Error = MalformedEvent;
    fn try_from(value: Value) -> Result<Self, Self::Error> { Row::new(value) }
}

impl From<Row> for Value {
    fn from(row: Row) -> Self { row.to_value() }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Row({})", Value::Object(self.0.fields.clone())) }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Row({})", self.0.id) }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::{
    id::{RowId, ID_FIELD},
    row::{parse_timestamp, Row, CREATED_AT_FIELD},
};

/// Ordering requested from a snapshot read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn desc(field: impl Into<String>) -> Self { Self { field: field.into(), descending: true } }

    pub fn asc(field: impl Into<String>) -> Self { Self { field: field.into(), descending: false } }

    /// Compare two rows under this ordering. Rows missing the field sort last in either direction.
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        match (a.get(&self.field), b.get(&self.field)) {
            (Some(x), Some(y)) => {
                let ord = compare_values(x, y);
                if self.descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl Default for OrderBy {
    fn default() -> Self { Self::desc(CREATED_AT_FIELD) }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(tx), Some(ty)) => tx.cmp(&ty),
            _ => x.cmp(y),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Equality filter a transport may use to narrow what it reads or delivers.
///
/// Filters are an optimization only; the engine re-checks membership locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelFilter {
    Eq { field: String, value: Value },
}

impl ChannelFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self { ChannelFilter::Eq { field: field.into(), value: value.into() } }

    /// Filter matching a single row identity
    pub fn id(id: &RowId) -> Self { ChannelFilter::Eq { field: ID_FIELD.to_string(), value: id.to_json() } }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            ChannelFilter::Eq { field, value } => row.get(field) == Some(value),
        }
    }

    /// Whether a raw row image satisfies this filter, for transports that filter before validation
    pub fn matches_value(&self, image: &Value) -> bool {
        match self {
            ChannelFilter::Eq { field, value } => image.get(field) == Some(value),
        }
    }
}

impl std::fmt::Display for ChannelFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelFilter::Eq { field, value } => write!(f, "{}=eq.{}", field, value),
        }
    }
}

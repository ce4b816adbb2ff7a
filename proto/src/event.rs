use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::MalformedEvent,
    id::{RowId, ID_FIELD},
    row::Row,
};

/// A validated row-level change delivered by the change feed
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Created(Row),
    Updated(Row),
    /// Only the identity of a deleted row is guaranteed to be available
    Deleted(RowId),
}

impl ChangeEvent {
    pub fn id(&self) -> &RowId {
        match self {
            ChangeEvent::Created(row) | ChangeEvent::Updated(row) => row.id(),
            ChangeEvent::Deleted(id) => id,
        }
    }

    /// The new row image, for creates and updates
    pub fn row(&self) -> Option<&Row> {
        match self {
            ChangeEvent::Created(row) | ChangeEvent::Updated(row) => Some(row),
            ChangeEvent::Deleted(_) => None,
        }
    }

    pub fn kind(&self) -> WireEventKind {
        match self {
            ChangeEvent::Created(_) => WireEventKind::Insert,
            ChangeEvent::Updated(_) => WireEventKind::Update,
            ChangeEvent::Deleted(_) => WireEventKind::Delete,
        }
    }
}

impl std::fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeEvent::Created(row) => write!(f, "Created({})", row.id()),
            ChangeEvent::Updated(row) => write!(f, "Updated({})", row.id()),
            ChangeEvent::Deleted(id) => write!(f, "Deleted({})", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WireEventKind {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for WireEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireEventKind::Insert => write!(f, "INSERT"),
            WireEventKind::Update => write!(f, "UPDATE"),
            WireEventKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// The raw payload a change feed transport delivers, before validation.
///
/// `new` holds the row image after the change, `old` the image (or at least the identity) before it.
/// Deletes usually carry an empty `new` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "eventType")]
    pub kind: WireEventKind,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
}

impl WireEvent {
    pub fn insert(new: impl Into<Value>) -> Self { Self { kind: WireEventKind::Insert, new: Some(new.into()), old: None } }

    pub fn update(new: impl Into<Value>) -> Self { Self { kind: WireEventKind::Update, new: Some(new.into()), old: None } }

    pub fn delete(id: impl Into<RowId>) -> Self {
        let mut old = serde_json::Map::new();
        old.insert(ID_FIELD.to_string(), id.into().to_json());
        Self { kind: WireEventKind::Delete, new: Some(Value::Object(Default::default())), old: Some(Value::Object(old)) }
    }
}

fn image_id(image: Option<&Value>) -> Result<RowId, MalformedEvent> {
    match image {
        Some(Value::Object(fields)) => RowId::from_json(fields.get(ID_FIELD).unwrap_or(&Value::Null)),
        Some(_) => Err(MalformedEvent::NotAnObject),
        None => Err(MalformedEvent::MissingImage(WireEventKind::Delete)),
    }
}

impl TryFrom<WireEvent> for ChangeEvent {
    type Error = MalformedEvent;
    fn try_from(event: WireEvent) -> Result<Self, Self::Error> {
        match event.kind {
            WireEventKind::Insert => Ok(ChangeEvent::Created(Row::new(event.new.ok_or(MalformedEvent::MissingImage(event.kind))?)?)),
            WireEventKind::Update => Ok(ChangeEvent::Updated(Row::new(event.new.ok_or(MalformedEvent::MissingImage(event.kind))?)?)),
            WireEventKind::Delete => {
                // Prefer the old image; some transports only populate `new` with the key
                let id = image_id(event.old.as_ref()).or_else(|err| image_id(event.new.as_ref()).map_err(|_| err))?;
                Ok(ChangeEvent::Deleted(id))
            }
        }
    }
}

impl From<&ChangeEvent> for WireEvent {
    fn from(event: &ChangeEvent) -> Self {
        match event {
            ChangeEvent::Created(row) => WireEvent::insert(row.to_value()),
            ChangeEvent::Updated(row) => WireEvent::update(row.to_value()),
            ChangeEvent::Deleted(id) => WireEvent::delete(id.clone()),
        }
    }
}

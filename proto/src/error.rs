use thiserror::Error;

use crate::event::WireEventKind;

/// A row image or change event that cannot be reconciled.
///
/// These never propagate to consumers. The engine drops the offending event and reports it as a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEvent {
    #[error("row image is not a JSON object")]
    NotAnObject,

    #[error("row image has no id field")]
    MissingId,

    #[error("id is neither an integer nor a string: {0}")]
    InvalidId(String),

    #[error("{0} event carries no usable row image")]
    MissingImage(WireEventKind),
}

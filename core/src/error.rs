//! Error and diagnostic types.
//!
//! None of these are returned from the `subscribe_*` calls. Failures resolve into cache state
//! (empty or absent, loading cleared) and are reported through [`Diagnostic`]s.

use std::sync::Arc;

use rowsync_proto::{CollectionId, MalformedEvent};
use thiserror::Error;

/// A snapshot read failed. The cache stays empty and is not retried.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The remote could not be reached
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The read did not complete within the configured snapshot timeout
    #[error("timeout")]
    Timeout,

    /// The remote refused the read, for example for lack of access
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(CollectionId),

    #[error("backend error: {0}")]
    Backend(Arc<anyhow::Error>),
}

impl From<anyhow::Error> for TransportError {
    fn from(err: anyhow::Error) -> Self { TransportError::Backend(Arc::new(err)) }
}

/// Opening a change channel failed. Live updates are absent but the snapshot still loads.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("change feed closed")]
    Closed,

    #[error("channel refused: {0}")]
    Refused(String),
}

/// A non-fatal condition observed by a cache
#[derive(Debug, Clone)]
pub enum Diagnostic {
    SnapshotFailed(TransportError),
    ChannelFailed(ChannelError),
    /// The remote side ended the change feed. Live updates stop; nothing reconnects.
    ChannelClosed,
    /// An event could not be reconciled and was dropped
    MalformedEvent(MalformedEvent),
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::SnapshotFailed(err) => write!(f, "snapshot failed: {}", err),
            Diagnostic::ChannelFailed(err) => write!(f, "channel failed: {}", err),
            Diagnostic::ChannelClosed => write!(f, "channel closed by remote"),
            Diagnostic::MalformedEvent(err) => write!(f, "malformed event dropped: {}", err),
        }
    }
}

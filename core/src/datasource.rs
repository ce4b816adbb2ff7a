//! The boundary to the remote data store and its change feed.
//!
//! An application constructs one data source at startup and hands it to [`crate::Client`]
//! (or directly to each cache). It is torn down when the last handle is dropped.

use async_trait::async_trait;
use rowsync_proto::{ChannelFilter, CollectionId, OrderBy, Row, RowId, WireEvent};
use tokio::sync::mpsc;

use crate::error::{ChannelError, TransportError};

/// Pull-based reads against the remote store
#[async_trait]
pub trait RemoteRead: Send + Sync {
    /// All current rows of a collection in the requested order, optionally narrowed by an equality filter
    async fn read(&self, collection: &CollectionId, order: &OrderBy, filter: Option<&ChannelFilter>) -> Result<Vec<Row>, TransportError>;

    /// A single row by identity, or `None` if it does not exist
    async fn read_one(&self, collection: &CollectionId, id: &RowId) -> Result<Option<Row>, TransportError>;
}

/// Push-based delivery of row-level changes.
///
/// Transports are expected to deliver at least once and preserve per-row order. Nothing is assumed
/// about ordering across rows, and there is no way to replay from a point in time.
pub trait ChangeFeed: Send + Sync {
    /// Start delivering events for `collection` into `sink` until the returned handle is closed.
    /// Must not block; any handshake with the remote happens in the background.
    fn open(&self, collection: &CollectionId, filter: Option<ChannelFilter>, sink: EventSink) -> Result<Box<dyn ChannelHandle>, ChannelError>;
}

/// An open change channel. Closing stops delivery; closing twice is a no-op.
pub trait ChannelHandle: Send {
    fn close(&mut self);
}

pub trait DataSource: RemoteRead + ChangeFeed {}

impl<T> DataSource for T where T: RemoteRead + ChangeFeed {}

/// Where a transport puts the events it receives. Cheap to clone.
#[derive(Clone, Debug)]
pub struct EventSink(mpsc::UnboundedSender<WireEvent>);

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WireEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    /// Queue an event. Returns false once the subscription on the other end is gone,
    /// which transports may use to prune the sink.
    pub fn send(&self, event: WireEvent) -> bool { self.0.send(event).is_ok() }

    pub fn is_closed(&self) -> bool { self.0.is_closed() }
}

//! An in-process remote store and change feed.
//!
//! Useful for tests and local development: rows live in memory, mutations publish wire events
//! to every matching open channel, and a few hooks make transport behavior controllable
//! (held or failing reads, raw event injection, remote channel close).

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, Weak,
    },
};

use async_trait::async_trait;
use rowsync_core::{ChangeFeed, ChannelError, ChannelHandle, EventSink, RemoteRead, TransportError};
use rowsync_proto::{ChannelFilter, CollectionId, OrderBy, Row, RowId, WireEvent};
use tokio::sync::watch;
use tracing::debug;

#[derive(Clone, Default)]
pub struct MemoryDataSource(Arc<Inner>);

#[derive(Default)]
struct Inner {
    collections: Mutex<HashMap<CollectionId, Vec<Row>>>,
    channels: Mutex<BTreeMap<u64, Channel>>,
    next_channel: AtomicU64,
    gate: Mutex<Option<watch::Receiver<bool>>>,
    failing_reads: AtomicUsize,
    held_reads: AtomicUsize,
    refuse_channels: AtomicBool,
}

struct Channel {
    collection: CollectionId,
    filter: Option<ChannelFilter>,
    sink: EventSink,
}

impl MemoryDataSource {
    pub fn new() -> Self { Self::default() }

    pub fn create_collection(&self, collection: impl Into<CollectionId>) {
        self.0.collections.lock().expect("collections poisoned").entry(collection.into()).or_default();
    }

    /// Store a row (replacing any row with the same id) and publish an insert
    pub fn insert(&self, collection: impl Into<CollectionId>, row: Row) {
        let collection = collection.into();
        {
            let mut collections = self.0.collections.lock().expect("collections poisoned");
            let rows = collections.entry(collection.clone()).or_default();
            rows.retain(|r| r.id() != row.id());
            rows.push(row.clone());
        }
        let image = row.to_value();
        self.publish(&collection, WireEvent::insert(image.clone()), |filter| filter.matches_value(&image));
    }

    /// Replace a stored row and publish an update. Channels whose filter matched the row before or
    /// after the change both receive it. Returns false if the row did not exist.
    pub fn update(&self, collection: impl Into<CollectionId>, row: Row) -> bool {
        let collection = collection.into();
        let previous = {
            let mut collections = self.0.collections.lock().expect("collections poisoned");
            let Some(rows) = collections.get_mut(&collection) else { return false };
            let Some(slot) = rows.iter_mut().find(|r| r.id() == row.id()) else { return false };
            std::mem::replace(slot, row.clone())
        };
        let (old, new) = (previous.to_value(), row.to_value());
        self.publish(&collection, WireEvent::update(new.clone()), |filter| filter.matches_value(&new) || filter.matches_value(&old));
        true
    }

    /// Remove a stored row and publish a delete. Returns the removed row.
    pub fn delete(&self, collection: impl Into<CollectionId>, id: impl Into<RowId>) -> Option<Row> {
        let (collection, id) = (collection.into(), id.into());
        let removed = {
            let mut collections = self.0.collections.lock().expect("collections poisoned");
            let rows = collections.get_mut(&collection)?;
            let pos = rows.iter().position(|r| *r.id() == id)?;
            rows.remove(pos)
        };
        let old = removed.to_value();
        self.publish(&collection, WireEvent::delete(id), |filter| filter.matches_value(&old));
        Some(removed)
    }

    /// Deliver an arbitrary wire event to every open channel on the collection, ignoring filters
    /// and stored state. For duplicate, stale or malformed deliveries.
    pub fn publish_raw(&self, collection: impl Into<CollectionId>, event: WireEvent) {
        self.publish(&collection.into(), event, |_| true);
    }

    pub fn rows(&self, collection: impl Into<CollectionId>) -> Vec<Row> {
        self.0.collections.lock().expect("collections poisoned").get(&collection.into()).cloned().unwrap_or_default()
    }

    /// Hold snapshot reads until the returned gate is released or dropped.
    ///
    /// A held read captures the stored rows when it is issued and only delivers them on release,
    /// so changes made while it is held are reported by the change feed alone.
    pub fn hold_reads(&self) -> ReadGate {
        let (tx, rx) = watch::channel(false);
        *self.0.gate.lock().expect("read gate poisoned") = Some(rx);
        ReadGate { inner: Arc::downgrade(&self.0), tx }
    }

    /// Reads currently waiting on a held gate
    pub fn held_reads(&self) -> usize { self.0.held_reads.load(Ordering::SeqCst) }

    /// Make the next `count` reads fail with [`TransportError::Unavailable`]
    pub fn fail_reads(&self, count: usize) { self.0.failing_reads.store(count, Ordering::SeqCst); }

    /// Make channel opens fail with [`ChannelError::Refused`]
    pub fn refuse_channels(&self, refuse: bool) { self.0.refuse_channels.store(refuse, Ordering::SeqCst); }

    pub fn open_channels(&self) -> usize { self.0.channels.lock().expect("channels poisoned").len() }

    /// Drop every open channel as if the remote had hung up
    pub fn close_all_channels(&self) {
        let closed = std::mem::take(&mut *self.0.channels.lock().expect("channels poisoned"));
        debug!("memory source closed {} channels", closed.len());
    }

    fn publish(&self, collection: &CollectionId, event: WireEvent, matches: impl Fn(&ChannelFilter) -> bool) {
        let mut channels = self.0.channels.lock().expect("channels poisoned");
        channels.retain(|id, channel| {
            if channel.collection != *collection || !channel.filter.as_ref().map_or(true, &matches) {
                return true;
            }
            let delivered = channel.sink.send(event.clone());
            if !delivered {
                debug!("memory source pruning channel {} on {}", id, collection);
            }
            delivered
        });
    }

    fn take_failure(&self) -> bool {
        self.0.failing_reads.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }

    async fn pass_gate(&self) {
        let gate = self.0.gate.lock().expect("read gate poisoned").clone();
        if let Some(mut gate) = gate {
            let _held = HeldRead::new(&self.0.held_reads);
            // a dropped gate counts as released
            let _ = gate.wait_for(|open| *open).await;
        }
    }
}

#[async_trait]
impl RemoteRead for MemoryDataSource {
    async fn read(&self, collection: &CollectionId, order: &OrderBy, filter: Option<&ChannelFilter>) -> Result<Vec<Row>, TransportError> {
        let captured = {
            let collections = self.0.collections.lock().expect("collections poisoned");
            collections.get(collection).cloned()
        };
        self.pass_gate().await;
        if self.take_failure() {
            return Err(TransportError::Unavailable("injected read failure".into()));
        }

        let mut rows = captured.ok_or_else(|| TransportError::CollectionNotFound(collection.clone()))?;
        if let Some(filter) = filter {
            rows.retain(|row| filter.matches(row));
        }
        rows.sort_by(|a, b| order.compare(a, b));
        Ok(rows)
    }

    async fn read_one(&self, collection: &CollectionId, id: &RowId) -> Result<Option<Row>, TransportError> {
        let captured = {
            let collections = self.0.collections.lock().expect("collections poisoned");
            collections.get(collection).map(|rows| rows.iter().find(|row| row.id() == id).cloned())
        };
        self.pass_gate().await;
        if self.take_failure() {
            return Err(TransportError::Unavailable("injected read failure".into()));
        }
        captured.ok_or_else(|| TransportError::CollectionNotFound(collection.clone()))
    }
}

impl ChangeFeed for MemoryDataSource {
    fn open(&self, collection: &CollectionId, filter: Option<ChannelFilter>, sink: EventSink) -> Result<Box<dyn ChannelHandle>, ChannelError> {
        if self.0.refuse_channels.load(Ordering::SeqCst) {
            return Err(ChannelError::Refused("channels refused".into()));
        }
        let id = self.0.next_channel.fetch_add(1, Ordering::SeqCst);
        debug!("memory source opened channel {} on {} filter={:?}", id, collection, filter);
        self.0.channels.lock().expect("channels poisoned").insert(id, Channel { collection: collection.clone(), filter, sink });
        Ok(Box::new(MemoryChannel { id, inner: Arc::downgrade(&self.0) }))
    }
}

// counts a read parked at the gate, including one whose future is dropped while waiting
struct HeldRead<'a>(&'a AtomicUsize);

impl<'a> HeldRead<'a> {
    fn new(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for HeldRead<'_> {
    fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}

/// Handle for an open in-memory channel. Closes on drop.
pub struct MemoryChannel {
    id: u64,
    inner: Weak<Inner>,
}

impl ChannelHandle for MemoryChannel {
    fn close(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            if inner.channels.lock().expect("channels poisoned").remove(&self.id).is_some() {
                debug!("memory source channel {} closed", self.id);
            }
        }
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) { self.close(); }
}

/// Returned by [`MemoryDataSource::hold_reads`]. Held reads complete once this is released or dropped.
pub struct ReadGate {
    inner: Weak<Inner>,
    tx: watch::Sender<bool>,
}

impl ReadGate {
    pub fn release(self) { drop(self) }
}

impl Drop for ReadGate {
    fn drop(&mut self) {
        let _ = self.tx.send(true);
        if let Some(inner) = self.inner.upgrade() {
            if let Ok(mut gate) = inner.gate.lock() {
                *gate = None;
            }
        }
    }
}

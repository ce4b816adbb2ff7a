use std::sync::{Arc, Mutex};

use rowsync_proto::{ChangeEvent, ChannelFilter, CollectionId, Row, RowId, SubscriptionId};
use rowsync_signals::{
    broadcast::BroadcastId,
    porcelain::{IntoSubscribeListener, Subscribe, SubscriptionGuard},
    Listener, Peek, Signal, With,
};
use tracing::debug;

use crate::{
    cache::CacheCore,
    changes::{ChangeSet, RowChange},
    config::ClientConfig,
    datasource::DataSource,
    error::{Diagnostic, TransportError},
    reconcile,
    snapshot::load_record,
    startup::Reconcile,
};

/// Contents of a record cache: at most one row, with a fixed identity
#[derive(Debug)]
pub struct RecordSlot {
    tracked: RowId,
    row: Option<Row>,
}

impl RecordSlot {
    pub fn new(tracked: RowId) -> Self { Self { tracked, row: None } }

    pub fn row(&self) -> Option<&Row> { self.row.as_ref() }
}

impl Reconcile for RecordSlot {
    type Snapshot = Option<Row>;

    fn seed(&mut self, snapshot: Option<Row>) -> Vec<RowChange> {
        let tracked = &self.tracked;
        self.row = snapshot.filter(|row| row.id() == tracked);
        self.row.iter().cloned().map(RowChange::Initial).collect()
    }

    fn apply(&mut self, event: ChangeEvent) -> Option<RowChange> { reconcile::apply_record(&mut self.row, &self.tracked, event) }

    fn rows(&self) -> Vec<Row> { self.row.iter().cloned().collect() }
}

/// Where a record cache is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    /// No id: nothing is read and no channel is open
    Unbound,
    /// The snapshot for this id has not settled. A cache disposed before then stays here.
    Loading(RowId),
    /// The snapshot for this id has settled. The row itself may still be absent.
    Bound(RowId),
}

/// A live mirror of a single row, addressed by id.
///
/// The id can be changed (or cleared) at any time with [`RecordCache::set_id`]. Events for the
/// previous id stop affecting the cache as soon as the switch is made.
#[derive(Clone)]
pub struct RecordCache(Arc<Inner>);

struct Inner {
    core: CacheCore<RecordSlot>,
    tracked: Mutex<Option<RowId>>,
}

impl RecordCache {
    pub fn new(source: Arc<dyn DataSource>, collection: impl Into<CollectionId>, id: Option<RowId>, config: ClientConfig) -> Self {
        let inner = Inner { core: CacheCore::new(source, collection.into(), config), tracked: Mutex::new(id.clone()) };
        if let Some(id) = id {
            inner.start(id);
        }
        Self(Arc::new(inner))
    }

    pub fn collection(&self) -> &CollectionId { &self.0.core.collection }

    pub fn tracked(&self) -> Option<RowId> { self.0.tracked.lock().expect("tracked id poisoned").clone() }

    pub fn state(&self) -> RecordState {
        match self.tracked() {
            None => RecordState::Unbound,
            Some(id) if self.0.core.settled() => RecordState::Bound(id),
            Some(id) => RecordState::Loading(id),
        }
    }

    /// Point the cache at a different row, or at none. The current channel is closed first.
    /// Setting the id that is already tracked does nothing.
    pub fn set_id(&self, id: Option<RowId>) {
        let mut tracked = self.0.tracked.lock().expect("tracked id poisoned");
        if *tracked == id {
            return;
        }
        debug!("record cache on {} switching {:?} -> {:?}", self.0.core.collection, *tracked, id);
        *tracked = id.clone();
        match id {
            Some(id) => self.0.start(id),
            None => self.0.core.unsubscribe(),
        }
    }

    pub fn value(&self) -> Option<Row> { self.0.core.with_state(|slot| slot.and_then(|s| s.row().cloned())) }

    pub fn loading(&self) -> bool { self.0.core.loading() }

    pub fn is_loaded(&self) -> bool { !self.0.core.loading() }

    pub async fn wait_loaded(&self) { self.0.core.wait_loaded().await }

    pub fn diagnostics<F>(&self, listener: F) -> SubscriptionGuard
    where F: IntoSubscribeListener<Diagnostic> {
        self.0.core.subscribe_diagnostics(listener)
    }

    pub fn last_error(&self) -> Option<TransportError> { self.0.core.last_error() }

    pub fn id(&self) -> Option<SubscriptionId> { self.0.core.subscription_id() }

    pub fn dispose(&self) { self.0.core.dispose() }

    pub fn is_disposed(&self) -> bool { self.0.core.is_disposed() }
}

impl Inner {
    fn start(&self, id: RowId) {
        let core = &self.core;
        let snapshot = load_record(core.source.clone(), core.collection.clone(), id.clone(), core.config.clone());
        core.subscribe(RecordSlot::new(id.clone()), Some(ChannelFilter::id(&id)), snapshot);
    }
}

impl Signal for RecordCache {
    fn listen(&self, listener: Listener) -> SubscriptionGuard { self.0.core.listen(listener) }

    fn broadcast_id(&self) -> BroadcastId { self.0.core.broadcast_id() }
}

impl Peek<Option<Row>> for RecordCache {
    fn peek(&self) -> Option<Row> { self.value() }
}

impl With<Option<Row>> for RecordCache {
    fn with<R>(&self, f: impl FnOnce(&Option<Row>) -> R) -> R { f(&self.value()) }
}

impl Subscribe<ChangeSet> for RecordCache {
    fn subscribe<F>(&self, listener: F) -> SubscriptionGuard
    where F: IntoSubscribeListener<ChangeSet> {
        self.0.core.subscribe_changes(listener)
    }
}

impl std::fmt::Debug for RecordCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCache").field("collection", &self.0.core.collection).field("state", &self.state()).finish()
    }
}

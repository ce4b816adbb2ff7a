use std::sync::Arc;

use rowsync_proto::{ChangeEvent, CollectionId, Row, SubscriptionId};
use rowsync_signals::{
    broadcast::BroadcastId,
    porcelain::{IntoSubscribeListener, Subscribe, SubscriptionGuard},
    Listener, Peek, Signal, With,
};

use crate::{
    cache::CacheCore,
    changes::{ChangeSet, RowChange},
    config::ClientConfig,
    datasource::DataSource,
    error::{Diagnostic, TransportError},
    reconcile,
    rowset::RowSet,
    snapshot::load_snapshot,
    startup::Reconcile,
};

/// Contents of an unfiltered table cache
#[derive(Debug, Default)]
pub struct TableRows {
    rows: RowSet,
}

impl Reconcile for TableRows {
    type Snapshot = Vec<Row>;

    fn seed(&mut self, snapshot: Vec<Row>) -> Vec<RowChange> {
        self.rows = RowSet::from_snapshot(snapshot);
        self.rows.iter().cloned().map(RowChange::Initial).collect()
    }

    fn apply(&mut self, event: ChangeEvent) -> Option<RowChange> { reconcile::apply(&mut self.rows, event) }

    fn rows(&self) -> Vec<Row> { self.rows.to_vec() }
}

/// A live mirror of every row in one remote collection.
///
/// Seeded from an ordered snapshot and then kept current by the collection's change feed.
/// Rows that arrive after the snapshot are placed at the front. Cloning yields another handle
/// to the same cache; the subscription is disposed when the last handle is dropped.
#[derive(Clone)]
pub struct TableCache(Arc<CacheCore<TableRows>>);

impl TableCache {
    pub fn new(source: Arc<dyn DataSource>, collection: impl Into<CollectionId>, config: ClientConfig) -> Self {
        let core = CacheCore::new(source, collection.into(), config);
        let snapshot = load_snapshot(core.source.clone(), core.collection.clone(), None, core.config.clone());
        core.subscribe(TableRows::default(), None, snapshot);
        Self(Arc::new(core))
    }

    pub fn collection(&self) -> &CollectionId { &self.0.collection }

    /// Current rows, without registering any interest in changes
    pub fn value(&self) -> Vec<Row> { self.0.rows() }

    /// True until the snapshot has settled, successfully or not
    pub fn loading(&self) -> bool { self.0.loading() }

    pub fn is_loaded(&self) -> bool { !self.0.loading() }

    pub async fn wait_loaded(&self) { self.0.wait_loaded().await }

    pub fn diagnostics<F>(&self, listener: F) -> SubscriptionGuard
    where F: IntoSubscribeListener<Diagnostic> {
        self.0.subscribe_diagnostics(listener)
    }

    /// Why the snapshot failed, if it did
    pub fn last_error(&self) -> Option<TransportError> { self.0.last_error() }

    pub fn id(&self) -> Option<SubscriptionId> { self.0.subscription_id() }

    pub fn dispose(&self) { self.0.dispose() }

    pub fn is_disposed(&self) -> bool { self.0.is_disposed() }
}

impl Signal for TableCache {
    fn listen(&self, listener: Listener) -> SubscriptionGuard { self.0.listen(listener) }

    fn broadcast_id(&self) -> BroadcastId { self.0.broadcast_id() }
}

impl Peek<Vec<Row>> for TableCache {
    fn peek(&self) -> Vec<Row> { self.value() }
}

impl With<Vec<Row>> for TableCache {
    fn with<R>(&self, f: impl FnOnce(&Vec<Row>) -> R) -> R { f(&self.value()) }
}

impl Subscribe<ChangeSet> for TableCache {
    fn subscribe<F>(&self, listener: F) -> SubscriptionGuard
    where F: IntoSubscribeListener<ChangeSet> {
        self.0.subscribe_changes(listener)
    }
}

impl std::fmt::Debug for TableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableCache").field("collection", &self.0.collection).field("loading", &self.loading()).finish()
    }
}

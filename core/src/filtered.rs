use std::sync::{Arc, Mutex};

use rowsync_proto::{ChangeEvent, CollectionId, Row, SubscriptionId};
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
    predicate::{Predicate, PredicateId},
    reconcile,
    rowset::RowSet,
    snapshot::load_snapshot,
    startup::Reconcile,
};

/// Contents of a filtered cache: the rows that currently pass the predicate
#[derive(Debug)]
pub struct FilteredRows {
    rows: RowSet,
    predicate: Predicate,
}

impl FilteredRows {
    pub fn new(predicate: Predicate) -> Self { Self { rows: RowSet::new(), predicate } }
}

impl Reconcile for FilteredRows {
    type Snapshot = Vec<Row>;

    // the snapshot may have been narrowed remotely, but membership is always decided here
    fn seed(&mut self, snapshot: Vec<Row>) -> Vec<RowChange> {
        self.rows = RowSet::from_snapshot(snapshot.into_iter().filter(|row| self.predicate.matches(row)));
        self.rows.iter().cloned().map(RowChange::Initial).collect()
    }

    fn apply(&mut self, event: ChangeEvent) -> Option<RowChange> { reconcile::apply_filtered(&mut self.rows, event, &self.predicate) }

    fn rows(&self) -> Vec<Row> { self.rows.to_vec() }
}

/// A live mirror of the rows in a collection that satisfy a predicate.
///
/// Every incoming row image is re-checked, so rows move in and out of the cache as their fields change.
#[derive(Clone)]
pub struct FilteredCache(Arc<Inner>);

struct Inner {
    core: CacheCore<FilteredRows>,
    predicate: Mutex<Predicate>,
}

impl FilteredCache {
    pub fn new(source: Arc<dyn DataSource>, collection: impl Into<CollectionId>, predicate: Predicate, config: ClientConfig) -> Self {
        let inner = Inner { core: CacheCore::new(source, collection.into(), config), predicate: Mutex::new(predicate.clone()) };
        inner.start(predicate);
        Self(Arc::new(inner))
    }

    pub fn collection(&self) -> &CollectionId { &self.0.core.collection }

    pub fn predicate(&self) -> Predicate { self.0.predicate.lock().expect("predicate poisoned").clone() }

    pub fn predicate_id(&self) -> PredicateId { self.0.predicate.lock().expect("predicate poisoned").id() }

    /// Switch to a different predicate. A predicate with the same identity as the current one is a
    /// no-op; anything else tears down the subscription and builds a new one.
    pub fn set_predicate(&self, predicate: Predicate) {
        let mut current = self.0.predicate.lock().expect("predicate poisoned");
        if current.id() == predicate.id() {
            return;
        }
        debug!("filtered cache on {} switching predicate {} -> {}", self.0.core.collection, current.id(), predicate.id());
        *current = predicate.clone();
        self.0.start(predicate);
    }

    pub fn value(&self) -> Vec<Row> { self.0.core.rows() }

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
    fn start(&self, predicate: Predicate) {
        let core = &self.core;
        let filter = predicate.channel_filter().cloned();
        let snapshot = load_snapshot(core.source.clone(), core.collection.clone(), filter.clone(), core.config.clone());
        core.subscribe(FilteredRows::new(predicate), filter, snapshot);
    }
}

impl Signal for FilteredCache {
    fn listen(&self, listener: Listener) -> SubscriptionGuard { self.0.core.listen(listener) }

    fn broadcast_id(&self) -> BroadcastId { self.0.core.broadcast_id() }
}

impl Peek<Vec<Row>> for FilteredCache {
    fn peek(&self) -> Vec<Row> { self.value() }
}

impl With<Vec<Row>> for FilteredCache {
    fn with<R>(&self, f: impl FnOnce(&Vec<Row>) -> R) -> R { f(&self.value()) }
}

impl Subscribe<ChangeSet> for FilteredCache {
    fn subscribe<F>(&self, listener: F) -> SubscriptionGuard
    where F: IntoSubscribeListener<ChangeSet> {
        self.0.core.subscribe_changes(listener)
    }
}

impl std::fmt::Debug for FilteredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredCache").field("collection", &self.0.core.collection).field("predicate", &self.predicate_id()).finish()
    }
}

//! State shared by every cache shape: the live subscription, load status and the two
//! notification streams.

use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use rowsync_proto::{ChannelFilter, CollectionId, Row, SubscriptionId};
use rowsync_signals::{
    broadcast::Broadcast,
    porcelain::{IntoSubscribeListener, SubscriptionGuard},
    Listener,
};
use tokio::sync::Notify;
use tracing::debug;

use crate::{
    changes::{ChangeSet, RowChange},
    config::ClientConfig,
    datasource::DataSource,
    error::{Diagnostic, TransportError},
    startup::Reconcile,
    subscription::Subscription,
};

#[derive(Debug, Default)]
struct Status {
    generation: u64,
    loading: bool,
    // the current generation's snapshot has settled, successfully or not
    settled: bool,
    disposed: bool,
    last_error: Option<TransportError>,
    // removals for rows of the superseded subscription, delivered with the next initial change set
    reset: Vec<RowChange>,
}

/// Where subscriptions report to. Outlives any single subscription of its cache.
///
/// Every report carries the generation of the subscription that made it. Reports from a
/// subscription that has since been replaced are dropped.
pub(crate) struct Outputs {
    status: Mutex<Status>,
    changes: Broadcast<ChangeSet>,
    diagnostics: Broadcast<Diagnostic>,
    settled: Notify,
}

impl Outputs {
    fn new() -> Self { Self { status: Mutex::new(Status::default()), changes: Broadcast::new(), diagnostics: Broadcast::new(), settled: Notify::new() } }

    fn is_current(&self, generation: u64) -> bool {
        let status = self.status.lock().expect("cache status poisoned");
        !status.disposed && status.generation == generation
    }

    /// Start a new loading generation, superseding whatever subscription came before.
    /// Removals not yet delivered stay queued alongside the new ones.
    fn begin(&self, reset: Vec<RowChange>) -> u64 {
        let mut status = self.status.lock().expect("cache status poisoned");
        status.generation += 1;
        status.loading = true;
        status.settled = false;
        status.last_error = None;
        merge_removals(&mut status.reset, reset);
        status.generation
    }

    /// Start an idle generation with nothing to load. Returns every removal still owed to
    /// consumers, including `reset`.
    fn clear(&self, reset: Vec<RowChange>) -> Vec<RowChange> {
        let pending = {
            let mut status = self.status.lock().expect("cache status poisoned");
            status.generation += 1;
            status.loading = false;
            status.settled = false;
            status.last_error = None;
            let mut pending = std::mem::take(&mut status.reset);
            merge_removals(&mut pending, reset);
            pending
        };
        self.settled.notify_waiters();
        pending
    }

    pub(crate) fn settle(&self, generation: u64, subscription: SubscriptionId, changes: Vec<RowChange>, error: Option<TransportError>) {
        let mut all = {
            let mut status = self.status.lock().expect("cache status poisoned");
            if status.disposed || status.generation != generation {
                return;
            }
            status.loading = false;
            status.settled = true;
            status.last_error = error.clone();
            std::mem::take(&mut status.reset)
        };
        all.extend(changes);
        self.settled.notify_waiters();

        self.changes.send(ChangeSet { subscription, changes: all, initial: true });
        if let Some(err) = error {
            self.diagnostics.send(Diagnostic::SnapshotFailed(err));
        }
    }

    pub(crate) fn publish(&self, generation: u64, subscription: SubscriptionId, changes: Vec<RowChange>) {
        if changes.is_empty() || !self.is_current(generation) {
            return;
        }
        self.changes.send(ChangeSet { subscription, changes, initial: false });
    }

    pub(crate) fn diagnose(&self, generation: u64, diagnostic: Diagnostic) {
        if self.is_current(generation) {
            self.diagnostics.send(diagnostic);
        }
    }
}

// a row is removed at most once, however many subscriptions are superseded before delivery
fn merge_removals(pending: &mut Vec<RowChange>, more: Vec<RowChange>) {
    for change in more {
        if !pending.iter().any(|queued| queued.id() == change.id()) {
            pending.push(change);
        }
    }
}

/// A cache's subscription slot plus its outputs
pub(crate) struct CacheCore<S> {
    pub(crate) source: Arc<dyn DataSource>,
    pub(crate) collection: CollectionId,
    pub(crate) config: ClientConfig,
    outputs: Arc<Outputs>,
    current: Mutex<Option<Subscription<S>>>,
}

impl<S> CacheCore<S>
where
    S: Reconcile + Send + 'static,
    S::Snapshot: Send + 'static,
{
    pub(crate) fn new(source: Arc<dyn DataSource>, collection: CollectionId, config: ClientConfig) -> Self {
        Self { source, collection, config, outputs: Arc::new(Outputs::new()), current: Mutex::new(None) }
    }

    /// Replace the current subscription. The old channel is closed before the new one is opened.
    pub(crate) fn subscribe<F>(&self, state: S, filter: Option<ChannelFilter>, snapshot: F)
    where F: Future<Output = Result<S::Snapshot, TransportError>> + Send + 'static {
        let mut current = self.current.lock().expect("cache subscription poisoned");
        if self.is_disposed() {
            debug!("ignoring resubscribe of disposed cache on {}", self.collection);
            return;
        }
        let reset = Self::retire(&mut current);
        let generation = self.outputs.begin(reset);
        *current = Some(Subscription::start(&self.source, &self.collection, filter, state, snapshot, self.outputs.clone(), generation));
    }

    /// Drop the current subscription without starting another. The cache settles as empty.
    pub(crate) fn unsubscribe(&self) {
        let reset = {
            let mut current = self.current.lock().expect("cache subscription poisoned");
            if self.is_disposed() {
                return;
            }
            let reset = Self::retire(&mut current);
            self.outputs.clear(reset)
        };
        if !reset.is_empty() {
            self.outputs.changes.send(ChangeSet { subscription: SubscriptionId::default(), changes: reset, initial: false });
        }
    }

    // the previous subscription's rows are no longer visible once it is gone
    fn retire(current: &mut Option<Subscription<S>>) -> Vec<RowChange> {
        match current.take() {
            Some(mut old) => {
                old.dispose();
                old.with_state(|state| state.rows()).into_iter().map(RowChange::Removed).collect()
            }
            None => Vec::new(),
        }
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(Option<&S>) -> R) -> R {
        let current = self.current.lock().expect("cache subscription poisoned");
        match current.as_ref() {
            Some(subscription) => subscription.with_state(|state| f(Some(state))),
            None => f(None),
        }
    }

    pub(crate) fn rows(&self) -> Vec<Row> { self.with_state(|state| state.map(|s| s.rows()).unwrap_or_default()) }
}

impl<S> CacheCore<S> {
    pub(crate) fn subscription_id(&self) -> Option<SubscriptionId> { self.current.lock().expect("cache subscription poisoned").as_ref().map(|s| s.id()) }

    pub(crate) fn loading(&self) -> bool { self.outputs.status.lock().expect("cache status poisoned").loading }

    pub(crate) fn settled(&self) -> bool { self.outputs.status.lock().expect("cache status poisoned").settled }

    pub(crate) fn last_error(&self) -> Option<TransportError> { self.outputs.status.lock().expect("cache status poisoned").last_error.clone() }

    pub(crate) fn is_disposed(&self) -> bool { self.outputs.status.lock().expect("cache status poisoned").disposed }

    /// Resolves once the current subscription's snapshot has settled, or the cache is disposed
    pub(crate) async fn wait_loaded(&self) {
        loop {
            let notified = self.outputs.settled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let status = self.outputs.status.lock().expect("cache status poisoned");
                if !status.loading || status.disposed {
                    return;
                }
            }
            notified.await;
        }
    }

    pub(crate) fn listen(&self, listener: Listener) -> SubscriptionGuard { SubscriptionGuard::new(self.outputs.changes.reference().listen(listener)) }

    pub(crate) fn broadcast_id(&self) -> rowsync_signals::broadcast::BroadcastId { self.outputs.changes.id() }

    pub(crate) fn subscribe_changes<F>(&self, listener: F) -> SubscriptionGuard
    where F: IntoSubscribeListener<ChangeSet> {
        let listener = listener.into_subscribe_listener();
        SubscriptionGuard::new(self.outputs.changes.reference().listen(move |changes: ChangeSet| listener(changes)))
    }

    pub(crate) fn subscribe_diagnostics<F>(&self, listener: F) -> SubscriptionGuard
    where F: IntoSubscribeListener<Diagnostic> {
        let listener = listener.into_subscribe_listener();
        SubscriptionGuard::new(self.outputs.diagnostics.reference().listen(move |diagnostic: Diagnostic| listener(diagnostic)))
    }

    /// Close the channel and stop the driver. The last value stays readable. Idempotent.
    pub(crate) fn dispose(&self) {
        let mut current = self.current.lock().expect("cache subscription poisoned");
        {
            let mut status = self.outputs.status.lock().expect("cache status poisoned");
            if status.disposed {
                return;
            }
            status.disposed = true;
            status.loading = false;
        }
        if let Some(subscription) = current.as_mut() {
            subscription.dispose();
        }
        drop(current);
        self.outputs.settled.notify_waiters();
        debug!("cache on {} disposed", self.collection);
    }
}

impl<S> Drop for CacheCore<S> {
    fn drop(&mut self) { self.dispose(); }
}

//! One live subscription: a change channel, a snapshot read and the task that feeds both into a
//! [`Startup`] machine.

use std::{
    future::Future,
    sync::{Arc, Mutex, Weak},
};

use rowsync_proto::{ChangeEvent, ChannelFilter, CollectionId, SubscriptionId, WireEvent};
use tokio::{sync::mpsc::UnboundedReceiver, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    cache::Outputs,
    datasource::{ChannelHandle, DataSource, EventSink},
    error::{ChannelError, Diagnostic, TransportError},
    startup::{Reconcile, Startup},
};

pub(crate) struct Shared<S> {
    pub(crate) id: SubscriptionId,
    pub(crate) generation: u64,
    pub(crate) machine: Mutex<Startup<S>>,
}

/// Owns the channel handle and the driver task. Dropping it disposes.
pub(crate) struct Subscription<S> {
    shared: Arc<Shared<S>>,
    channel: Option<Box<dyn ChannelHandle>>,
    task: Option<JoinHandle<()>>,
}

impl<S> Subscription<S>
where
    S: Reconcile + Send + 'static,
    S::Snapshot: Send + 'static,
{
    /// Open the channel, then start the snapshot read in a driver task.
    /// A channel that fails to open is reported and the snapshot is loaded anyway.
    pub(crate) fn start<F>(
        source: &Arc<dyn DataSource>,
        collection: &CollectionId,
        filter: Option<ChannelFilter>,
        state: S,
        snapshot: F,
        outputs: Arc<Outputs>,
        generation: u64,
    ) -> Self
    where
        F: Future<Output = Result<S::Snapshot, TransportError>> + Send + 'static,
    {
        let id = SubscriptionId::new();
        let shared = Arc::new(Shared { id, generation, machine: Mutex::new(Startup::new(state)) });

        let (sink, events) = EventSink::channel();
        let (channel, events, failure) = match source.open(collection, filter.clone(), sink) {
            Ok(handle) => (Some(handle), Some(events), None),
            Err(err) => {
                warn!("{} failed to open change channel on {}: {}", id, collection, err);
                (None, None, Some(err))
            }
        };
        debug!("{} subscribed to {} filter={:?}", id, collection, filter.map(|f| f.to_string()));

        let task = crate::task::spawn(drive(Arc::downgrade(&shared), outputs, events, failure, snapshot));
        Self { shared, channel, task: Some(task) }
    }
}

impl<S> Subscription<S> {
    pub(crate) fn id(&self) -> SubscriptionId { self.shared.id }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R { f(self.shared.machine.lock().expect("startup machine poisoned").state()) }

    /// Close the machine first so nothing in flight can touch state, then release the channel and the task
    pub(crate) fn dispose(&mut self) {
        if let Ok(mut machine) = self.shared.machine.lock() {
            machine.close();
        }
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("{} disposed", self.shared.id);
        }
    }
}

impl<S> Drop for Subscription<S> {
    fn drop(&mut self) { self.dispose(); }
}

impl<S: Reconcile> Shared<S> {
    fn settle(&self, outputs: &Outputs, result: Result<S::Snapshot, TransportError>) {
        let error = result.as_ref().err().cloned();
        let changes = {
            let mut machine = self.machine.lock().expect("startup machine poisoned");
            match machine.on_snapshot(result) {
                Some(changes) => changes,
                None => return,
            }
        };

        match &error {
            Some(err) => warn!("{} snapshot failed: {}", self.id, err),
            None => debug!("{} snapshot settled with {} changes", self.id, changes.len()),
        }
        outputs.settle(self.generation, self.id, changes, error);
    }

    fn deliver(&self, outputs: &Outputs, wire: WireEvent) {
        let event = match ChangeEvent::try_from(wire) {
            Ok(event) => event,
            Err(err) => {
                if !self.machine.lock().expect("startup machine poisoned").is_closed() {
                    warn!("{} dropped malformed event: {}", self.id, err);
                    outputs.diagnose(self.generation, Diagnostic::MalformedEvent(err));
                }
                return;
            }
        };

        let change = {
            let mut machine = self.machine.lock().expect("startup machine poisoned");
            if machine.is_closed() {
                return;
            }
            machine.on_event(event)
        };
        if let Some(change) = change {
            outputs.publish(self.generation, self.id, vec![change]);
        }
    }

    fn channel_ended(&self, outputs: &Outputs) {
        if self.machine.lock().expect("startup machine poisoned").is_closed() {
            return;
        }
        debug!("{} change channel closed by remote", self.id);
        outputs.diagnose(self.generation, Diagnostic::ChannelClosed);
    }
}

async fn drive<S, F>(
    shared: Weak<Shared<S>>,
    outputs: Arc<Outputs>,
    mut events: Option<UnboundedReceiver<WireEvent>>,
    channel_failure: Option<ChannelError>,
    snapshot: F,
) where
    S: Reconcile,
    F: Future<Output = Result<S::Snapshot, TransportError>>,
{
    if let Some(err) = channel_failure {
        let Some(shared) = shared.upgrade() else { return };
        outputs.diagnose(shared.generation, Diagnostic::ChannelFailed(err));
    }
    tokio::pin!(snapshot);
    let mut snapshot_pending = true;

    loop {
        tokio::select! {
            result = &mut snapshot, if snapshot_pending => {
                snapshot_pending = false;
                let Some(shared) = shared.upgrade() else { return };
                shared.settle(&outputs, result);
            }
            event = next_event(&mut events), if events.is_some() => {
                let Some(shared) = shared.upgrade() else { return };
                match event {
                    Some(wire) => shared.deliver(&outputs, wire),
                    None => {
                        events = None;
                        shared.channel_ended(&outputs);
                    }
                }
            }
            else => return,
        }
    }
}

async fn next_event(events: &mut Option<UnboundedReceiver<WireEvent>>) -> Option<WireEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

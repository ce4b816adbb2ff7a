use rowsync_proto::{ChangeEvent, Row};

use crate::changes::RowChange;

/// Cache state that can be seeded from a snapshot and then advanced by change events
pub trait Reconcile {
    type Snapshot;

    /// Replace the contents with a snapshot
    fn seed(&mut self, snapshot: Self::Snapshot) -> Vec<RowChange>;

    fn apply(&mut self, event: ChangeEvent) -> Option<RowChange>;

    /// Current contents in display order
    fn rows(&self) -> Vec<Row>;
}

#[derive(Debug)]
pub enum Phase {
    /// Snapshot outstanding; live events are held in arrival order
    Buffering(Vec<ChangeEvent>),
    Ready,
    /// Disposed. All further input is ignored.
    Closed,
}

/// Resolves the race between a subscription's snapshot read and its change channel.
///
/// The channel is opened before the snapshot is requested, so events for rows the snapshot
/// does or does not contain can arrive first. They are held until the snapshot lands and then
/// replayed over it in arrival order. Replay is safe because reconciliation is idempotent.
#[derive(Debug)]
pub struct Startup<S> {
    phase: Phase,
    state: S,
    snapshot_failed: bool,
}

impl<S> Startup<S> {
    pub fn new(state: S) -> Self { Self { phase: Phase::Buffering(Vec::new()), state, snapshot_failed: false } }

    pub fn state(&self) -> &S { &self.state }

    pub fn phase(&self) -> &Phase { &self.phase }

    pub fn is_ready(&self) -> bool { matches!(self.phase, Phase::Ready) }

    pub fn is_closed(&self) -> bool { matches!(self.phase, Phase::Closed) }

    pub fn snapshot_failed(&self) -> bool { self.snapshot_failed }

    pub fn buffered(&self) -> usize {
        match &self.phase {
            Phase::Buffering(events) => events.len(),
            _ => 0,
        }
    }

    pub fn close(&mut self) { self.phase = Phase::Closed; }
}

impl<S: Reconcile> Startup<S> {
    /// Feed a live event. Returns the visible change, which is always `None` while buffering.
    pub fn on_event(&mut self, event: ChangeEvent) -> Option<RowChange> {
        match &mut self.phase {
            Phase::Buffering(events) => {
                events.push(event);
                None
            }
            Phase::Ready => self.state.apply(event),
            Phase::Closed => None,
        }
    }

    /// Settle the snapshot. A failed snapshot leaves the cache empty and discards buffered events;
    /// live events after it still apply. Returns `None` if the machine was not waiting for a snapshot.
    pub fn on_snapshot<E>(&mut self, result: Result<S::Snapshot, E>) -> Option<Vec<RowChange>> {
        let buffered = match std::mem::replace(&mut self.phase, Phase::Ready) {
            Phase::Buffering(events) => events,
            other => {
                self.phase = other;
                return None;
            }
        };

        match result {
            Ok(snapshot) => {
                let mut changes = self.state.seed(snapshot);
                changes.extend(buffered.into_iter().filter_map(|event| self.state.apply(event)));
                Some(changes)
            }
            Err(_) => {
                self.snapshot_failed = true;
                Some(Vec::new())
            }
        }
    }
}

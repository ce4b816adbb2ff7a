use crate::{broadcast::BroadcastId, porcelain::SubscriptionGuard};
use std::sync::Arc;

/// A notify-only listener, for observers that re-read the value themselves
pub type Listener = Arc<dyn Fn() + Send + Sync + 'static>;

/// Core observation capability, without regard to the payload
pub trait Signal {
    /// Be told whenever the signal changes
    fn listen(&self, listener: Listener) -> SubscriptionGuard;

    fn broadcast_id(&self) -> BroadcastId;
}

/// Access the current value with a borrow
pub trait With<T> {
    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R;
}

/// Get a clone of the current value
pub trait Peek<T> {
    fn peek(&self) -> T;
}

use crate::broadcast::ListenerGuard;

pub type SubscribeListener<T> = Box<dyn Fn(T) + Send + Sync + 'static>;

pub trait IntoSubscribeListener<T> {
    fn into_subscribe_listener(self) -> SubscribeListener<T>;
}

/// Subscribe to changes with a listener that receives each new value or change
pub trait Subscribe<T: 'static> {
    fn subscribe<F>(&self, listener: F) -> SubscriptionGuard
    where F: IntoSubscribeListener<T>;
}

/// Keeps a listener registered. Dropping the guard unsubscribes.
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct SubscriptionGuard {
    _listenerguard: Box<dyn std::any::Any + Send + Sync>,
}

impl SubscriptionGuard {
    pub fn new<T: 'static>(guard: ListenerGuard<T>) -> Self { Self { _listenerguard: Box::new(guard) } }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("SubscriptionGuard") }
}

impl<T: Send + 'static> IntoSubscribeListener<T> for std::sync::mpsc::Sender<T> {
    fn into_subscribe_listener(self) -> SubscribeListener<T> {
        let sender = std::sync::Mutex::new(self);
        Box::new(move |value| {
            if let Ok(sender) = sender.lock() {
                let _ = sender.send(value);
            }
        })
    }
}

#[cfg(feature = "tokio")]
impl<T: Send + 'static> IntoSubscribeListener<T> for tokio::sync::mpsc::UnboundedSender<T> {
    fn into_subscribe_listener(self) -> SubscribeListener<T> {
        Box::new(move |value| {
            let _ = self.send(value);
        })
    }
}

impl<F, T> IntoSubscribeListener<T> for F
where F: Fn(T) + Send + Sync + 'static
{
    fn into_subscribe_listener(self) -> SubscribeListener<T> { Box::new(self) }
}

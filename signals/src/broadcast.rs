use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// Identifies a broadcast for deduplication and comparison. Only a Broadcast can mint one.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BroadcastId(usize);

impl std::fmt::Display for BroadcastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "B{}", self.0) }
}

/// A listener invoked synchronously when a broadcast sends
#[derive(Clone)]
pub enum BroadcastListener<T = ()> {
    /// Receives the broadcast value
    Payload(Arc<dyn Fn(T) + Send + Sync + 'static>),
    /// Only learns that something was sent
    NotifyOnly(Arc<dyn Fn() + Send + Sync + 'static>),
}

pub trait IntoBroadcastListener<T> {
    fn into_broadcast_listener(self) -> BroadcastListener<T>;
}

/// Synchronous multi-listener notifier.
///
/// Listeners are called on the sending thread, in registration order, without any lock held,
/// so a listener may register or drop other listeners while being notified.
pub struct Broadcast<T = ()>(Arc<Inner<T>>);

struct Inner<T> {
    listeners: RwLock<BTreeMap<usize, BroadcastListener<T>>>,
    next_id: AtomicUsize,
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> std::fmt::Debug for Broadcast<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcast").field("listeners", &self.listener_count()).finish()
    }
}

/// A listen-only reference to a broadcast
pub struct Ref<'a, T>(&'a Broadcast<T>);

/// Removes its listener from the broadcast when dropped. Does not keep the broadcast alive.
pub struct ListenerGuard<T = ()> {
    inner: Weak<Inner<T>>,
    id: usize,
}

impl<T> ListenerGuard<T> {
    pub fn broadcast_id(&self) -> BroadcastId { BroadcastId(self.inner.as_ptr() as usize) }
}

impl<T> Default for Broadcast<T>
where T: Clone
{
    fn default() -> Self { Self::new() }
}

impl<T> Broadcast<T> {
    pub fn new() -> Self { Self(Arc::new(Inner { listeners: RwLock::new(BTreeMap::new()), next_id: AtomicUsize::new(0) })) }

    pub fn id(&self) -> BroadcastId { BroadcastId(Arc::as_ptr(&self.0) as usize) }

    pub fn listener_count(&self) -> usize { self.0.listeners.read().expect("broadcast listeners poisoned").len() }

    /// Listen-only view, so holders can subscribe without being able to send
    pub fn reference(&self) -> Ref<'_, T> { Ref(self) }
}

impl<T> Broadcast<T>
where T: Clone
{
    /// Send a value to every active listener
    pub fn send(&self, value: T) {
        let listeners = {
            let listeners = self.0.listeners.read().expect("broadcast listeners poisoned");
            listeners.values().cloned().collect::<Vec<_>>()
        };

        // the last listener gets the original, everyone else a clone
        if let Some((last, rest)) = listeners.split_last() {
            for listener in rest {
                match listener {
                    BroadcastListener::Payload(callback) => callback(value.clone()),
                    BroadcastListener::NotifyOnly(callback) => callback(),
                }
            }
            match last {
                BroadcastListener::Payload(callback) => callback(value),
                BroadcastListener::NotifyOnly(callback) => callback(),
            }
        }
    }
}

impl<T> Ref<'_, T> {
    pub fn listen<L>(&self, listener: L) -> ListenerGuard<T>
    where L: IntoBroadcastListener<T> {
        let inner = &self.0.0;
        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        inner.listeners.write().expect("broadcast listeners poisoned").insert(id, listener.into_broadcast_listener());
        ListenerGuard { inner: Arc::downgrade(inner), id }
    }

    pub fn broadcast_id(&self) -> BroadcastId { self.0.id() }
}

impl<T> Drop for ListenerGuard<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            if let Ok(mut listeners) = inner.listeners.write() {
                listeners.remove(&self.id);
            }
        }
    }
}

impl<F, T> IntoBroadcastListener<T> for F
where F: Fn(T) + Send + Sync + 'static
{
    fn into_broadcast_listener(self) -> BroadcastListener<T> { BroadcastListener::Payload(Arc::new(self)) }
}

impl<T> IntoBroadcastListener<T> for BroadcastListener<T> {
    fn into_broadcast_listener(self) -> BroadcastListener<T> { self }
}

impl<T> IntoBroadcastListener<T> for Arc<dyn Fn() + Send + Sync + 'static> {
    fn into_broadcast_listener(self) -> BroadcastListener<T> { BroadcastListener::NotifyOnly(self) }
}

#[cfg(feature = "tokio")]
impl<T> IntoBroadcastListener<T> for tokio::sync::mpsc::UnboundedSender<T>
where T: Send + 'static
{
    fn into_broadcast_listener(self) -> BroadcastListener<T> {
        BroadcastListener::Payload(Arc::new(move |value| {
            // receiver gone means nobody is waiting
            let _ = self.send(value);
        }))
    }
}

#[allow(unused)]
pub use rowsync::signals::{
    broadcast::{BroadcastListener, IntoBroadcastListener},
    porcelain::{IntoSubscribeListener, SubscribeListener},
    Peek, Subscribe, Wait,
};
#[allow(unused)]
pub use rowsync::{ChangeKind, ChangeSet, Client, ClientConfig, Diagnostic, Predicate, Row, RowId, WireEvent};
#[allow(unused)]
pub use rowsync_connector_memory::MemoryDataSource;
use serde_json::json;
use std::{
    future::Future,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::Notify;
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

#[allow(unused)]
pub fn task(id: i64, created_at: i64, status: &str) -> Row {
    Row::new(json!({"id": id, "created_at": created_at, "status": status, "title": format!("task {}", id)})).unwrap()
}

#[allow(unused)]
pub fn lease(id: &str, holder: &str) -> Row { Row::new(json!({"id": id, "holder": holder})).unwrap() }

#[allow(unused)]
pub fn ids(rows: &[Row]) -> Vec<RowId> { rows.iter().map(|r| r.id().clone()).collect() }

#[allow(unused)]
pub fn client(remote: &MemoryDataSource) -> Client { Client::new(Arc::new(remote.clone())) }

/// Polls `check` until it holds, for at most five seconds
#[allow(unused)]
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

/// Waits until a cache's value satisfies `check`, for at most five seconds
#[allow(unused)]
pub async fn wait_until<S, T, F>(cache: &S, check: F) -> bool
where
    S: Wait<T>,
    T: Send + Sync + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    tokio::time::timeout(Duration::from_secs(5), cache.wait_for(check)).await.is_ok()
}

/// Lets spawned tasks run and queued events drain
#[allow(unused)]
pub async fn settle() { tokio::time::sleep(Duration::from_millis(50)).await; }

/// Accumulates notifications and provides async waiting methods
#[derive(Clone)]
pub struct TestWatcher<T, U> {
    items: Arc<Mutex<Vec<T>>>,
    notify: Arc<Notify>,
    transform: Arc<dyn Fn(T) -> U + Send + Sync>,
}

#[allow(unused)]
impl<T> TestWatcher<T, T> {
    pub fn new() -> Self { Self { items: Arc::new(Mutex::new(Vec::new())), notify: Arc::new(Notify::new()), transform: Arc::new(|x| x) } }
}

#[allow(unused)]
impl TestWatcher<ChangeSet, Vec<(RowId, ChangeKind)>> {
    /// Reduces each change set to its (id, kind) pairs
    pub fn changeset() -> Self {
        Self { items: Arc::new(Mutex::new(Vec::new())), notify: Arc::new(Notify::new()), transform: Arc::new(|changeset: ChangeSet| changeset.summary()) }
    }
}

#[allow(unused)]
impl<T, U> TestWatcher<T, U> {
    /// Takes (empties and returns) all accumulated items, applying the transform
    pub fn drain(&self) -> Vec<U> { self.items.lock().unwrap().drain(..).map(|item| (self.transform)(item)).collect() }

    pub fn count(&self) -> usize { self.items.lock().unwrap().len() }

    /// Waits for `count` items to accumulate, then drains and returns them
    pub async fn take(&self, count: usize) -> anyhow::Result<Vec<U>> {
        if !self.wait_for_count(count, Duration::from_secs(5)).await {
            return Err(anyhow::anyhow!("take({}) timed out, got {} items", count, self.count()));
        }
        let mut items = self.items.lock().unwrap();
        Ok(items.drain(0..count).map(|item| (self.transform)(item)).collect())
    }

    pub async fn take_one(&self) -> anyhow::Result<U> {
        let mut items = self.take(1).await?;
        Ok(items.remove(0))
    }

    /// Waits briefly for stragglers, then returns the count
    pub async fn quiesce(&self) -> usize {
        settle().await;
        self.count()
    }

    pub async fn wait_for_count(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.items.lock().unwrap().len() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

impl<T: Send + 'static, U> IntoSubscribeListener<T> for &TestWatcher<T, U> {
    fn into_subscribe_listener(self) -> SubscribeListener<T> {
        let items = self.items.clone();
        let notify = self.notify.clone();
        Box::new(move |item: T| {
            items.lock().unwrap().push(item);
            notify.notify_waiters();
        })
    }
}

use std::sync::Arc;

use crate::signal::{Signal, With};

/// Return type of a `wait_for` predicate
///
/// - `Some(output)` stops waiting and yields `output`
/// - `None` keeps waiting for the next change
pub trait WaitResult {
    type Output;
    fn result(self) -> Option<Self::Output>;
}

impl WaitResult for bool {
    type Output = ();
    fn result(self) -> Option<Self::Output> { if self { Some(()) } else { None } }
}

impl<T> WaitResult for Option<T> {
    type Output = T;
    fn result(self) -> Option<Self::Output> { self }
}

/// Asynchronously wait for a signal to reach some state
pub trait Wait<T: 'static> {
    fn wait_for<F, R>(&self, predicate: F) -> impl std::future::Future<Output = R::Output> + Send
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: WaitResult + Send,
        R::Output: Send,
        T: Send + Sync;

    fn wait_value(&self, target: T) -> impl std::future::Future<Output = ()> + Send
    where T: PartialEq + Send + Sync {
        self.wait_for(move |v| *v == target)
    }
}

impl<T, S> Wait<T> for S
where
    S: Signal + With<T> + Sync,
    T: 'static,
{
    fn wait_for<F, R>(&self, predicate: F) -> impl std::future::Future<Output = R::Output> + Send
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: WaitResult + Send,
        R::Output: Send,
        T: Send + Sync,
    {
        async move {
            // bridge the synchronous broadcast into the async world
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let _guard = self.listen(Arc::new(move || {
                let _ = tx.send(());
            }));

            loop {
                if let Some(result) = self.with(|value| predicate(value).result()) {
                    return result;
                }
                if rx.recv().await.is_none() {
                    // the guard holds the sender alive, so this only happens if the broadcast is torn down
                    tracing::warn!("wait_for: broadcast closed before the condition was met");
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

use std::future::Future;

use tokio::task::JoinHandle;

/// Spawn a background task on the ambient tokio runtime
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future)
}

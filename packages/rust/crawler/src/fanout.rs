//! Bounded concurrent fan-out over independent requests.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::warn;

/// Run `f` over every item with at most `limit` futures in flight.
///
/// Results come back in input order. A task that panics yields `None` in its
/// slot; its siblings keep running and are still collected.
pub async fn bounded<I, T, F, Fut>(items: Vec<I>, limit: usize, f: F) -> Vec<Option<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        let sem = semaphore.clone();
        let task = f(item);
        handles.push(tokio::spawn(async move {
            // The semaphore is never closed, so the permit is always granted.
            let _permit = sem.acquire().await.ok();
            task.await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(value) => results.push(Some(value)),
            Err(e) => {
                warn!(error = %e, "fetch task aborted");
                results.push(None);
            }
        }
    }
    results
}

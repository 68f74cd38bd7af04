use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinSet;
use tracing::warn;

/// Background work the host must wait for before tearing the worker down.
#[derive(Default)]
pub struct PendingWork {
    tasks: Mutex<JoinSet<()>>,
    /// Tasks spawned and not yet finished, including those being settled
    in_flight: Arc<AtomicUsize>,
}

/// Counts a task down when it finishes, panics or is aborted
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PendingWork {
    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `work` in the background. Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(&self.in_flight));

        let mut tasks = self.lock();
        // Reap finished tasks so the set does not grow without bound
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let _guard = guard;
            work.await;
        });
    }

    pub fn len(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until every spawned task has finished, including tasks spawned
    /// while waiting. Tasks being awaited here still count in `len`.
    pub async fn settle(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.lock());
            if tasks.is_empty() {
                return;
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Background task did not complete");
                }
            }
        }
    }
}

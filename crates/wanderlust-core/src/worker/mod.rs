//! The offline cache manager.
//!
//! One `OfflineCacheManager` is one worker instance. The host delivers the
//! lifecycle signals (`install`, `activate`), then routes fetches and push
//! messages to it until it calls `terminate`. Every signal handler returns a
//! future that completes only when all of the work it started has settled;
//! the host must await it before it considers the phase done.
//!
//! Background cache write-backs started by `handle_fetch` outlive the call;
//! they are tracked and awaited by `settle` / `terminate`.

mod fetch;
mod lifecycle;
mod pending;
mod push;
mod routing;
mod state;

#[cfg(test)]
mod testing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cache::CacheStorage;
use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::host::{ClientControl, NotificationSink};
use crate::network::Network;

pub use fetch::{FetchOutcome, ResponseSource};
pub use pending::PendingWork;
pub use push::{build_notification, PushMessage, DEFAULT_PUSH_BODY, NOTIFICATION_TITLE};
pub use routing::Route;
pub use state::{ActivateReport, InstallReport, SeedFailure, WorkerState};

/// Substrates the host provides to a worker.
#[derive(Clone)]
pub struct Host {
    pub network: Arc<dyn Network>,
    pub storage: Arc<dyn CacheStorage>,
    pub clients: Arc<dyn ClientControl>,
    pub notifier: Arc<dyn NotificationSink>,
}

pub struct OfflineCacheManager {
    config: Arc<WorkerConfig>,
    host: Host,
    state: Mutex<WorkerState>,
    skip_waiting: AtomicBool,
    pending: PendingWork,
}

impl OfflineCacheManager {
    /// A freshly parsed worker, waiting for `install`
    pub fn new(config: Arc<WorkerConfig>, host: Host) -> Self {
        Self::resume(config, host, WorkerState::Parsed)
    }

    /// Rebuild a worker whose lifecycle was recorded by the host
    pub fn resume(config: Arc<WorkerConfig>, host: Host, state: WorkerState) -> Self {
        Self {
            config,
            host,
            state: Mutex::new(state),
            skip_waiting: AtomicBool::new(false),
            pending: PendingWork::default(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.lock_state()
    }

    /// Set once install has finished: the worker takes over without waiting
    /// for older instances to release their pages.
    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Number of background write-backs still in flight
    pub fn pending_work(&self) -> usize {
        self.pending.len()
    }

    /// Wait for all background write-backs to finish
    pub async fn settle(&self) {
        self.pending.settle().await;
    }

    /// Finish outstanding work and retire this instance
    pub async fn terminate(&self) {
        self.settle().await;
        self.set_state(WorkerState::Terminated);
    }

    fn lock_state(&self) -> MutexGuard<'_, WorkerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: WorkerState) {
        *self.lock_state() = next;
    }

    /// Move `from → to` atomically, or report the state that blocked `signal`
    fn begin(
        &self,
        signal: &'static str,
        from: WorkerState,
        to: WorkerState,
    ) -> Result<(), WorkerError> {
        let mut state = self.lock_state();
        if *state != from {
            return Err(WorkerError::InvalidState {
                signal,
                actual: *state,
            });
        }
        *state = to;
        Ok(())
    }
}

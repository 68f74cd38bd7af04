//! Install and activate phases.
//!
//! Both phases fan out every sub-operation at once and join on settlement:
//! the phase completes when every branch has finished, whatever its outcome,
//! and no failing branch cancels its siblings. Deletion and seeding failures
//! are logged and dropped here; they never reach the host.

use std::sync::atomic::Ordering;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use super::state::{ActivateReport, InstallReport, SeedFailure, WorkerState};
use super::OfflineCacheManager;
use crate::cache::Bucket;
use crate::error::{NetworkError, StorageError, WorkerError};
use crate::models::Request;

/// Why a single seed resource did not make it into the bucket.
#[derive(Error, Debug)]
enum SeedError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("server answered {0}")]
    BadStatus(u16),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

struct SeedOutcome {
    seeded: Vec<Url>,
    failed: Vec<SeedFailure>,
}

impl OfflineCacheManager {
    /// Handle the install signal.
    ///
    /// Purges the legacy buckets and seeds the current one concurrently. Seed
    /// failures are reported but do not fail the install; only failing to
    /// open the current bucket does, and then the instance is retired.
    pub async fn install(&self) -> Result<InstallReport, WorkerError> {
        self.begin("install", WorkerState::Parsed, WorkerState::Installing)?;
        info!(cache = %self.config.cache_name, "Installing");

        let (legacy_deleted, seeded) = tokio::join!(self.purge_legacy(), self.seed_current());

        let seeded = match seeded {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(cache = %self.config.cache_name, error = %e, "Could not open current cache");
                self.set_state(WorkerState::Terminated);
                return Err(e.into());
            }
        };

        // Take over as soon as we are installed
        self.skip_waiting.store(true, Ordering::SeqCst);
        self.set_state(WorkerState::Waiting);

        info!(
            seeded = seeded.seeded.len(),
            failed = seeded.failed.len(),
            "Install complete"
        );
        Ok(InstallReport {
            legacy_deleted,
            seeded: seeded.seeded,
            failed: seeded.failed,
        })
    }

    /// Handle the activate signal.
    ///
    /// Purges legacy buckets, removes every bucket that is not the current
    /// one, and claims open pages, all concurrently. Nothing here can fail
    /// the activation.
    pub async fn activate(&self) -> Result<ActivateReport, WorkerError> {
        self.begin("activate", WorkerState::Waiting, WorkerState::Activating)?;
        info!(cache = %self.config.cache_name, "Activating");

        let (legacy, stale, clients_claimed) =
            tokio::join!(self.purge_legacy(), self.purge_stale(), self.claim_clients());

        let mut deleted = legacy;
        deleted.extend(stale);
        deleted.sort();
        deleted.dedup();

        self.set_state(WorkerState::Active);
        info!(deleted = deleted.len(), clients_claimed, "Activation complete");
        Ok(ActivateReport {
            deleted,
            clients_claimed,
        })
    }

    /// Delete every legacy bucket; returns the ones that existed
    async fn purge_legacy(&self) -> Vec<String> {
        let deletions = self
            .config
            .legacy_caches
            .iter()
            .map(|name| self.delete_bucket(name.clone()));
        join_all(deletions).await.into_iter().flatten().collect()
    }

    /// Delete every bucket whose name is not the current version
    async fn purge_stale(&self) -> Vec<String> {
        let names = match self.host.storage.keys().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Failed to list caches");
                return Vec::new();
            }
        };

        let deletions = names
            .into_iter()
            .filter(|name| *name != self.config.cache_name)
            .map(|name| self.delete_bucket(name));
        join_all(deletions).await.into_iter().flatten().collect()
    }

    async fn delete_bucket(&self, name: String) -> Option<String> {
        match self.host.storage.delete(&name).await {
            Ok(true) => {
                info!(cache = %name, "Deleted old cache");
                Some(name)
            }
            Ok(false) => None,
            Err(e) => {
                warn!(cache = %name, error = %e, "Failed to delete cache");
                None
            }
        }
    }

    async fn claim_clients(&self) -> bool {
        match self.host.clients.claim().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to claim clients");
                false
            }
        }
    }

    /// Open the current bucket and add every seed resource independently
    async fn seed_current(&self) -> Result<SeedOutcome, StorageError> {
        let bucket = self.host.storage.open(&self.config.cache_name).await?;
        info!(cache = %self.config.cache_name, "Opened cache");

        let attempts = self.config.seed_urls.iter().map(|raw| {
            let bucket = bucket.as_ref();
            async move { (raw, self.add(bucket, raw).await) }
        });

        let mut outcome = SeedOutcome {
            seeded: Vec::new(),
            failed: Vec::new(),
        };
        for (raw, result) in join_all(attempts).await {
            match result {
                Ok(url) => outcome.seeded.push(url),
                Err(e) => {
                    warn!(url = %raw, error = %e, "Failed to cache seed resource");
                    outcome.failed.push(SeedFailure {
                        url: raw.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }

    /// Fetch one resource and store it; non-2xx answers are not stored
    async fn add(&self, bucket: &dyn Bucket, raw: &str) -> Result<Url, SeedError> {
        let url = self.config.resolve(raw)?;
        let request = Request::get(url.clone());
        let response = self.host.network.fetch(&request).await?;
        if !response.ok() {
            return Err(SeedError::BadStatus(response.status));
        }
        bucket.put(&request, response).await?;
        debug!(url = %url, "Seeded");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::super::testing::{config, get, FailingClients, FaultyStorage, Harness};
    use super::super::Host;
    use super::*;
    use crate::cache::{CacheStorage, MemoryStorage};
    use crate::models::Response;

    #[tokio::test]
    async fn test_install_seeds_every_resource() {
        let harness = Harness::new();
        harness.serve_all_seeds();

        let report = harness.worker.install().await.unwrap();

        assert_eq!(report.seeded.len(), 7);
        assert!(report.failed.is_empty());
        assert_eq!(harness.worker.state(), WorkerState::Waiting);
        assert!(harness.worker.skip_waiting());
        let home = harness.cached("/").await.unwrap();
        assert_eq!(home.text(), "seed /");
        assert!(harness
            .cached("https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.7.2/css/all.min.css")
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_install_succeeds_when_seeds_fail() {
        let storage = Arc::new(MemoryStorage::new());
        storage.open("wanderlust-v1").await.unwrap();
        storage.open("wanderlust-v2").await.unwrap();
        let harness = Harness::with_storage(storage.clone());
        harness.serve_all_seeds();
        harness.network.go_offline("/css/rating.css");
        harness.network.respond("/js/script.js", Response::new(404, "missing"));

        let report = harness.worker.install().await.unwrap();

        assert_eq!(report.seeded.len(), 5);
        let failed: HashSet<_> = report.failed.iter().map(|f| f.url.as_str()).collect();
        assert_eq!(failed, HashSet::from(["/css/rating.css", "/js/script.js"]));
        assert!(report.failed.iter().any(|f| f.reason.contains("404")));

        // Legacy buckets gone, current bucket present regardless of failures
        assert_eq!(storage.keys().await.unwrap(), vec!["wanderlust-v3"]);
        let mut legacy = report.legacy_deleted.clone();
        legacy.sort();
        assert_eq!(legacy, vec!["wanderlust-v1", "wanderlust-v2"]);
        assert!(harness.cached("/js/script.js").await.is_none());
        assert!(harness.cached("/css/style.css").await.is_some());
    }

    #[tokio::test]
    async fn test_install_with_network_down_still_creates_bucket() {
        let harness = Harness::new();

        let report = harness.worker.install().await.unwrap();

        assert!(report.seeded.is_empty());
        assert_eq!(report.failed.len(), 7);
        assert!(harness.storage.has("wanderlust-v3").await.unwrap());
        assert_eq!(harness.worker.state(), WorkerState::Waiting);
    }

    #[tokio::test]
    async fn test_install_tolerates_failed_legacy_delete() {
        let mut storage = FaultyStorage::default();
        storage.inner.open("wanderlust-v1").await.unwrap();
        storage.inner.open("wanderlust-v2").await.unwrap();
        storage.failing_deletes.insert("wanderlust-v1".to_string());
        let harness = Harness::with_storage(Arc::new(storage));
        harness.serve_all_seeds();

        let report = harness.worker.install().await.unwrap();

        assert_eq!(report.legacy_deleted, vec!["wanderlust-v2"]);
        assert_eq!(report.seeded.len(), 7);
        assert_eq!(harness.worker.state(), WorkerState::Waiting);
    }

    #[tokio::test]
    async fn test_install_fails_when_bucket_cannot_open() {
        let storage = FaultyStorage {
            fail_open: true,
            ..FaultyStorage::default()
        };
        let harness = Harness::with_storage(Arc::new(storage));

        let err = harness.worker.install().await.unwrap_err();

        assert!(matches!(err, WorkerError::Storage(_)));
        assert_eq!(harness.worker.state(), WorkerState::Terminated);
        assert!(!harness.worker.skip_waiting());
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let harness = Harness::new();
        harness.worker.install().await.unwrap();

        let err = harness.worker.install().await.unwrap_err();
        assert!(matches!(
            err,
            WorkerError::InvalidState {
                signal: "install",
                actual: WorkerState::Waiting
            }
        ));
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let harness = Harness::new();
        let err = harness.worker.activate().await.unwrap_err();
        assert!(matches!(
            err,
            WorkerError::InvalidState {
                actual: WorkerState::Parsed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_activate_leaves_only_current_bucket() {
        let storage = Arc::new(MemoryStorage::new());
        let harness = Harness::with_storage(storage.clone());
        harness.serve_all_seeds();
        harness.worker.install().await.unwrap();

        // Buckets that show up between install and activate, known or not
        storage.open("wanderlust-v2").await.unwrap();
        storage.open("wanderlust-v3-preview").await.unwrap();
        storage.open("some-other-app").await.unwrap();

        let report = harness.worker.activate().await.unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["wanderlust-v3"]);
        assert_eq!(
            report.deleted,
            vec!["some-other-app", "wanderlust-v2", "wanderlust-v3-preview"]
        );
        assert!(report.clients_claimed);
        assert!(harness.clients.is_claimed());
        assert_eq!(harness.worker.state(), WorkerState::Active);
        assert!(harness.cached("/css/style.css").await.is_some());
    }

    #[tokio::test]
    async fn test_activate_survives_storage_and_claim_failures() {
        let mut storage = FaultyStorage::default();
        storage.inner.open("wanderlust-v1").await.unwrap();
        storage.inner.open("wanderlust-v3").await.unwrap();
        storage.failing_deletes.insert("wanderlust-v1".to_string());
        storage.fail_keys = true;
        let storage: Arc<dyn CacheStorage> = Arc::new(storage);

        let host = Host {
            network: Arc::new(super::super::testing::ScriptedNetwork::default()),
            storage: storage.clone(),
            clients: Arc::new(FailingClients),
            notifier: Arc::new(super::super::testing::RecordingNotifier::default()),
        };
        let worker = OfflineCacheManager::resume(config(), host, WorkerState::Waiting);

        let report = worker.activate().await.unwrap();

        assert!(report.deleted.is_empty());
        assert!(!report.clients_claimed);
        assert_eq!(worker.state(), WorkerState::Active);
        assert!(storage.has("wanderlust-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_seeded_entries_are_keyed_by_absolute_url() {
        let harness = Harness::new();
        harness.serve_all_seeds();
        harness.worker.install().await.unwrap();

        let bucket = harness.storage.open("wanderlust-v3").await.unwrap();
        let keys = bucket.keys().await.unwrap();
        assert_eq!(keys.len(), 7);
        assert!(keys.contains(&get("/js/script.js")));
        assert!(keys.iter().all(|r| r.url.scheme() == "https"));
    }
}

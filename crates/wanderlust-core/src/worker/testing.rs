//! Scripted substrates for exercising the worker.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use super::{Host, OfflineCacheManager};
use crate::cache::{Bucket, CacheStorage, MemoryStorage};
use crate::config::WorkerConfig;
use crate::error::{NetworkError, StorageError};
use crate::host::{ClientControl, NotificationSink, PageClients};
use crate::models::{CachedEntry, Notification, Request, Response};
use crate::network::Network;

pub const ORIGIN: &str = "https://wanderlust.test";

pub fn config() -> Arc<WorkerConfig> {
    Arc::new(WorkerConfig::new(Url::parse(ORIGIN).unwrap()))
}

pub fn get(path_or_url: &str) -> Request {
    Request::get(Url::parse(ORIGIN).unwrap().join(path_or_url).unwrap())
}

/// Network whose answers are scripted per URL. Unscripted URLs are offline.
#[derive(Default)]
pub struct ScriptedNetwork {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedNetwork {
    pub fn respond(&self, path_or_url: &str, response: Response) {
        let url = get(path_or_url).cache_url();
        self.responses.lock().unwrap().insert(url, response);
    }

    pub fn go_offline(&self, path_or_url: &str) {
        let url = get(path_or_url).cache_url();
        self.responses.lock().unwrap().remove(&url);
    }

    pub fn calls(&self, path_or_url: &str) -> usize {
        let url = get(path_or_url).cache_url();
        self.calls.lock().unwrap().get(&url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let url = request.cache_url();
        *self.calls.lock().unwrap().entry(url.clone()).or_default() += 1;
        self.responses
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .ok_or_else(|| NetworkError::Offline(url))
    }
}

fn unavailable() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "storage unavailable")
}

/// In-memory storage with injectable failures.
#[derive(Default)]
pub struct FaultyStorage {
    pub inner: MemoryStorage,
    pub failing_deletes: HashSet<String>,
    pub fail_keys: bool,
    pub fail_open: bool,
    pub fail_writes: bool,
}

#[async_trait]
impl CacheStorage for FaultyStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Bucket>, StorageError> {
        if self.fail_open {
            return Err(StorageError::io(format!("opening bucket {}", name), unavailable()));
        }
        let bucket = self.inner.open(name).await?;
        if self.fail_writes {
            let bucket: Arc<dyn Bucket> = Arc::new(ReadOnlyBucket(bucket));
            return Ok(bucket);
        }
        Ok(bucket)
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        self.inner.has(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        if self.failing_deletes.contains(name) {
            return Err(StorageError::io(format!("deleting bucket {}", name), unavailable()));
        }
        self.inner.delete(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        if self.fail_keys {
            return Err(StorageError::io("listing buckets", unavailable()));
        }
        self.inner.keys().await
    }
}

struct ReadOnlyBucket(Arc<dyn Bucket>);

#[async_trait]
impl Bucket for ReadOnlyBucket {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn get(&self, request: &Request) -> Result<Option<Response>, StorageError> {
        self.0.get(request).await
    }

    async fn put(&self, _request: &Request, _response: Response) -> Result<(), StorageError> {
        Err(StorageError::io(
            "writing entry",
            io::Error::other("quota exceeded"),
        ))
    }

    async fn delete(&self, request: &Request) -> Result<bool, StorageError> {
        self.0.delete(request).await
    }

    async fn entries(&self) -> Result<Vec<CachedEntry>, StorageError> {
        self.0.entries().await
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn show_notification(&self, notification: &Notification) -> anyhow::Result<()> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl NotificationSink for FailingNotifier {
    async fn show_notification(&self, _notification: &Notification) -> anyhow::Result<()> {
        anyhow::bail!("permission denied")
    }
}

pub struct FailingClients;

#[async_trait]
impl ClientControl for FailingClients {
    async fn claim(&self) -> anyhow::Result<()> {
        anyhow::bail!("no clients reachable")
    }
}

/// Everything a test needs to poke at a worker from the outside.
pub struct Harness {
    pub network: Arc<ScriptedNetwork>,
    pub storage: Arc<dyn CacheStorage>,
    pub clients: Arc<PageClients>,
    pub notifier: Arc<RecordingNotifier>,
    pub worker: OfflineCacheManager,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(storage: Arc<dyn CacheStorage>) -> Self {
        let network = Arc::new(ScriptedNetwork::default());
        let clients = Arc::new(PageClients::new(1));
        let notifier = Arc::new(RecordingNotifier::default());
        let host = Host {
            network: network.clone(),
            storage: storage.clone(),
            clients: clients.clone(),
            notifier: notifier.clone(),
        };
        let worker = OfflineCacheManager::new(config(), host);
        Self {
            network,
            storage,
            clients,
            notifier,
            worker,
        }
    }

    /// Script a successful answer for every seed resource
    pub fn serve_all_seeds(&self) {
        for url in config().seed_urls.iter() {
            self.network.respond(url, Response::new(200, format!("seed {}", url)));
        }
    }

    /// Install and activate with every seed available
    pub async fn active() -> Self {
        let harness = Self::new();
        harness.serve_all_seeds();
        harness.worker.install().await.unwrap();
        harness.worker.activate().await.unwrap();
        harness
    }

    pub async fn cached(&self, path_or_url: &str) -> Option<Response> {
        self.storage
            .lookup(&config().cache_name, &get(path_or_url))
            .await
            .unwrap()
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::storage::{ensure_cacheable, Bucket, CacheStorage};
use crate::error::StorageError;
use crate::models::{CachedEntry, Request, Response};

#[derive(Default)]
pub struct MemoryStorage {
    buckets: RwLock<BTreeMap<String, Arc<MemoryBucket>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Bucket>, StorageError> {
        let mut buckets = self.buckets.write().await;
        let bucket: Arc<dyn Bucket> = buckets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryBucket::new(name)))
            .clone();
        Ok(bucket)
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.buckets.read().await.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.buckets.write().await.remove(name).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }
}

pub struct MemoryBucket {
    name: String,
    /// Cache URL → entry
    entries: RwLock<BTreeMap<String, CachedEntry>>,
}

impl MemoryBucket {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, request: &Request) -> Result<Option<Response>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&request.cache_url())
            .filter(|entry| entry.matches(request))
            .map(|entry| entry.response.clone()))
    }

    async fn put(&self, request: &Request, response: Response) -> Result<(), StorageError> {
        ensure_cacheable(request)?;
        let entry = CachedEntry::new(request.clone(), response);
        self.entries.write().await.insert(request.cache_url(), entry);
        Ok(())
    }

    async fn delete(&self, request: &Request) -> Result<bool, StorageError> {
        Ok(self.entries.write().await.remove(&request.cache_url()).is_some())
    }

    async fn entries(&self) -> Result<Vec<CachedEntry>, StorageError> {
        Ok(self.entries.read().await.values().cloned().collect())
    }
}

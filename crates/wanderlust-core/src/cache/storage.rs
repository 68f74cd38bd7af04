use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::{CachedEntry, Request, Response};

/// Named bucket store.
///
/// Implementations must allow concurrent independent reads and writes; the
/// cache manager never locks around them.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a bucket, creating it if it does not exist yet
    async fn open(&self, name: &str) -> Result<Arc<dyn Bucket>, StorageError>;

    async fn has(&self, name: &str) -> Result<bool, StorageError>;

    /// Delete a bucket and everything in it. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;

    /// Names of all buckets currently in storage
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Look up a request in the named bucket without creating the bucket
    async fn lookup(&self, name: &str, request: &Request) -> Result<Option<Response>, StorageError> {
        if !self.has(name).await? {
            return Ok(None);
        }
        self.open(name).await?.get(request).await
    }
}

#[async_trait]
pub trait Bucket: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, request: &Request) -> Result<Option<Response>, StorageError>;

    /// Store a response under `request`, replacing any entry for the same URL.
    /// Only GET requests can be stored.
    async fn put(&self, request: &Request, response: Response) -> Result<(), StorageError>;

    async fn delete(&self, request: &Request) -> Result<bool, StorageError>;

    async fn entries(&self) -> Result<Vec<CachedEntry>, StorageError>;

    async fn keys(&self) -> Result<Vec<Request>, StorageError> {
        Ok(self.entries().await?.into_iter().map(|e| e.request).collect())
    }
}

pub(crate) fn ensure_cacheable(request: &Request) -> Result<(), StorageError> {
    if request.is_get() {
        Ok(())
    } else {
        Err(StorageError::UnsupportedMethod(request.method.clone()))
    }
}

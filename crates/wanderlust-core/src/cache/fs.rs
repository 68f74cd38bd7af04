//! Buckets persisted on disk.
//!
//! Layout under the storage root:
//!
//! ```text
//! <hex(bucket name)>/
//!     <key>.entry   metadata as one JSON line, then the raw body
//! ```
//!
//! `key` is a SHA-256 prefix of the cache URL. Every write goes to its own
//! temporary file that is renamed over `<key>.entry`, so readers see either
//! the previous entry or the new one in full, and overlapping writes to the
//! same URL never share a file.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use super::storage::{ensure_cacheable, Bucket, CacheStorage};
use crate::error::StorageError;
use crate::models::{CachedEntry, Request, Response};

const ENTRY_EXT: &str = "entry";
const TMP_SUFFIX: &str = ".tmp";

/// Bytes of the URL digest used in entry file names
const KEY_BYTES: usize = 16;

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    request: Request,
    status: u16,
    headers: Vec<(String, String)>,
    cached_at: DateTime<Utc>,
}

pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, name: &str) -> PathBuf {
        self.root.join(hex::encode(name.as_bytes()))
    }
}

#[async_trait]
impl CacheStorage for FsStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Bucket>, StorageError> {
        let dir = self.bucket_dir(name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io(format!("creating bucket {}", name), e))?;
        let bucket: Arc<dyn Bucket> = Arc::new(FsBucket {
            name: name.to_string(),
            dir,
        });
        Ok(bucket)
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        fs::try_exists(self.bucket_dir(name))
            .await
            .map_err(|e| StorageError::io(format!("checking bucket {}", name), e))
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        match fs::remove_dir_all(self.bucket_dir(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(format!("deleting bucket {}", name), e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io("listing buckets", e)),
        };

        let mut names = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| StorageError::io("listing buckets", e))?
        {
            let is_dir = item
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            let file_name = item.file_name();
            let decoded = hex::decode(file_name.to_string_lossy().as_bytes())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok());
            match decoded {
                Some(name) => names.push(name),
                None => debug!(dir = ?file_name, "Skipping non-bucket directory"),
            }
        }
        names.sort();
        Ok(names)
    }
}

pub struct FsBucket {
    name: String,
    dir: PathBuf,
}

impl FsBucket {
    fn entry_key(request: &Request) -> String {
        let digest = Sha256::digest(request.cache_url().as_bytes());
        hex::encode(&digest[..KEY_BYTES])
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, ENTRY_EXT))
    }

    async fn read_entry(&self, key: &str) -> Result<Option<CachedEntry>, StorageError> {
        let bytes = match fs::read(self.entry_path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(format!("reading entry {}", key), e)),
        };
        decode_entry(&bytes).map(Some)
    }
}

/// Metadata line, newline, body. Compact JSON never contains a raw newline.
fn encode_entry(meta: &EntryMeta, body: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut contents = serde_json::to_vec(meta)?;
    contents.push(b'\n');
    contents.extend_from_slice(body);
    Ok(contents)
}

fn decode_entry(bytes: &[u8]) -> Result<CachedEntry, StorageError> {
    let split = bytes.iter().position(|b| *b == b'\n').unwrap_or(bytes.len());
    let meta: EntryMeta = serde_json::from_slice(&bytes[..split])?;
    let body = bytes.get(split + 1..).unwrap_or_default().to_vec();

    Ok(CachedEntry {
        request: meta.request,
        response: Response {
            status: meta.status,
            headers: meta.headers,
            body,
        },
        cached_at: meta.cached_at,
    })
}

/// Write `contents` to a fresh temporary file in `dir` and rename it to `target`
fn commit_file(dir: &Path, prefix: &str, target: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(TMP_SUFFIX)
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl Bucket for FsBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, request: &Request) -> Result<Option<Response>, StorageError> {
        if !request.is_get() {
            return Ok(None);
        }
        let entry = self.read_entry(&Self::entry_key(request)).await?;
        Ok(entry
            .filter(|entry| entry.matches(request))
            .map(|entry| entry.response))
    }

    async fn put(&self, request: &Request, response: Response) -> Result<(), StorageError> {
        ensure_cacheable(request)?;
        let key = Self::entry_key(request);

        let meta = EntryMeta {
            request: request.clone(),
            status: response.status,
            headers: response.headers,
            cached_at: Utc::now(),
        };
        let contents = encode_entry(&meta, &response.body)?;

        let dir = self.dir.clone();
        let target = self.entry_path(&key);
        let prefix = format!("{}.", key);
        tokio::task::spawn_blocking(move || commit_file(&dir, &prefix, &target, &contents))
            .await
            .map_err(|e| StorageError::io(format!("writing entry {}", key), std::io::Error::other(e)))?
            .map_err(|e| StorageError::io(format!("writing entry {}", key), e))?;

        debug!(cache = %self.name, url = %request.url, "Stored cache entry");
        Ok(())
    }

    async fn delete(&self, request: &Request) -> Result<bool, StorageError> {
        let key = Self::entry_key(request);
        match fs::remove_file(self.entry_path(&key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(format!("deleting entry {}", key), e)),
        }
    }

    async fn entries(&self) -> Result<Vec<CachedEntry>, StorageError> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(format!("listing bucket {}", self.name), e)),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| StorageError::io(format!("listing bucket {}", self.name), e))?
        {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read_entry(key).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!(cache = %self.name, key, error = %e, "Skipping unreadable cache entry"),
            }
        }
        entries.sort_by(|a, b| a.request.cache_url().cmp(&b.request.cache_url()));
        Ok(entries)
    }
}

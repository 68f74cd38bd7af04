//! Versioned cache buckets.
//!
//! A bucket is a named store of request/response pairs. The cache manager
//! serves from exactly one of them and garbage-collects the rest.
//!
//! - `CacheStorage` / `Bucket`: The storage substrate seen by the manager
//! - `MemoryStorage`: In-process buckets, used by tests and short-lived hosts
//! - `FsStorage`: Buckets persisted under a directory, one file pair per entry

pub mod fs;
pub mod memory;
pub mod storage;

pub use fs::FsStorage;
pub use memory::MemoryStorage;
pub use storage::{Bucket, CacheStorage};

//! Core library for the Wanderlust offline cache manager.
//!
//! This crate contains everything the host needs to run the offline layer
//! of the Wanderlust listing app:
//!
//! - `config`: The immutable worker configuration and host settings
//! - `models`: Requests, responses, cached entries and notifications
//! - `cache`: Versioned cache buckets (in-memory and on-disk)
//! - `network`: The network substrate and its `reqwest` implementation
//! - `host`: Page-control and notification substrates
//! - `worker`: The `OfflineCacheManager` lifecycle and fetch routing
//! - `validation`: Listing and review request-body schemas

pub mod cache;
pub mod config;
pub mod error;
pub mod host;
pub mod models;
pub mod network;
pub mod validation;
pub mod worker;

pub use config::{Settings, WorkerConfig};
pub use error::{NetworkError, StorageError, WorkerError};
pub use worker::OfflineCacheManager;

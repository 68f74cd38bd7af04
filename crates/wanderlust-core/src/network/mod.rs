//! Network substrate.
//!
//! The cache manager only ever talks to the network through the `Network`
//! trait. `HttpNetwork` is the real implementation, backed by `reqwest`.

pub mod client;

use async_trait::async_trait;

use crate::error::NetworkError;
use crate::models::{Request, Response};

pub use client::HttpNetwork;

#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. Any HTTP status is a successful fetch; only
    /// transport failures return an error.
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

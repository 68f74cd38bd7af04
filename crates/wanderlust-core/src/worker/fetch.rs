//! Fetch interception.
//!
//! Stylesheets and scripts go network first so pages pick up new assets as
//! soon as they are deployed; a successful answer is copied into the current
//! bucket in the background. Everything else goes cache first. A cache-first
//! miss that is answered by the network is not written back.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::routing::{is_icon, Route};
use super::OfflineCacheManager;
use crate::error::WorkerError;
use crate::models::{Request, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    /// Synthetic empty image standing in for an unreachable icon
    Placeholder,
}

/// Result of handling one intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Served {
        response: Response,
        source: ResponseSource,
    },
    /// Network-first request that failed on the network and was not cached.
    /// The page sees this as a failed fetch.
    NoResponse,
}

impl FetchOutcome {
    fn served(response: Response, source: ResponseSource) -> Self {
        FetchOutcome::Served { response, source }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Served { response, .. } => Some(response),
            FetchOutcome::NoResponse => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchOutcome::Served { response, .. } => Some(response),
            FetchOutcome::NoResponse => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Served { source, .. } => Some(*source),
            FetchOutcome::NoResponse => None,
        }
    }
}

impl OfflineCacheManager {
    /// Handle an intercepted request.
    ///
    /// The only error is a network failure on a cache-first miss for a
    /// non-icon path, passed through unchanged. Until the worker is active it
    /// does not control any page, so requests go straight to the network.
    pub async fn handle_fetch(&self, request: Request) -> Result<FetchOutcome, WorkerError> {
        if !self.state().controls_pages() {
            debug!(url = %request.url, state = %self.state(), "Not controlling pages, passing through");
            let response = self.host.network.fetch(&request).await?;
            return Ok(FetchOutcome::served(response, ResponseSource::Network));
        }

        match Route::classify(&self.config, &request) {
            Route::NetworkFirst => Ok(self.network_first(request).await),
            Route::CacheFirst => self.cache_first(request).await,
        }
    }

    async fn network_first(&self, request: Request) -> FetchOutcome {
        match self.host.network.fetch(&request).await {
            Ok(response) => {
                self.write_back(request, response.clone());
                FetchOutcome::served(response, ResponseSource::Network)
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "Network failed, falling back to cache");
                match self.lookup(&request).await {
                    Some(response) => FetchOutcome::served(response, ResponseSource::Cache),
                    None => FetchOutcome::NoResponse,
                }
            }
        }
    }

    async fn cache_first(&self, request: Request) -> Result<FetchOutcome, WorkerError> {
        if let Some(response) = self.lookup(&request).await {
            return Ok(FetchOutcome::served(response, ResponseSource::Cache));
        }

        match self.host.network.fetch(&request).await {
            Ok(response) => Ok(FetchOutcome::served(response, ResponseSource::Network)),
            Err(e) => {
                debug!(url = %request.url, error = %e, "Fetch error");
                if is_icon(&self.config, &request) {
                    info!(url = %request.url, "Icon fetch failed, returning empty response");
                    return Ok(FetchOutcome::served(
                        Response::placeholder_image(),
                        ResponseSource::Placeholder,
                    ));
                }
                Err(e.into())
            }
        }
    }

    /// Current-bucket lookup; a storage error counts as a miss
    async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.host.storage.lookup(&self.config.cache_name, request).await {
            Ok(found) => found,
            Err(e) => {
                warn!(url = %request.url, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    /// Store a copy of a network response without holding up the page
    fn write_back(&self, request: Request, response: Response) {
        let storage = Arc::clone(&self.host.storage);
        let cache_name = self.config.cache_name.clone();
        self.pending.spawn(async move {
            let stored = match storage.open(&cache_name).await {
                Ok(bucket) => bucket.put(&request, response).await,
                Err(e) => Err(e),
            };
            match stored {
                Ok(()) => debug!(url = %request.url, "Refreshed cache entry"),
                Err(e) => debug!(url = %request.url, error = %e, "Cache write-back failed"),
            }
        });
    }
}

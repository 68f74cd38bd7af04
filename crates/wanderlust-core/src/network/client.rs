//! HTTP implementation of the network substrate.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;

use super::Network;
use crate::error::NetworkError;
use crate::models::{Request, Response};

/// Network substrate backed by a shared `reqwest` client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    /// Create a client. With `timeout` unset, a hung fetch hangs its request.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let url = request.url.as_str();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| NetworkError::InvalidRequest(format!("bad method {}", request.method)))?;

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        // Snapshot the body; it can only be read once
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::from_reqwest(url, e))?
            .to_vec();

        debug!(url, status, bytes = body.len(), "Fetched from network");
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[tokio::test]
    async fn test_rejects_invalid_method() {
        let network = HttpNetwork::new(None).unwrap();
        let request = Request::new("GE T", Url::parse("http://127.0.0.1:9/").unwrap());
        let err = network.fetch(&request).await.unwrap_err();
        assert!(matches!(err, NetworkError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_offline() {
        let network = HttpNetwork::new(Some(Duration::from_secs(2))).unwrap();
        // Port 9 (discard) on loopback is closed on any sane test machine
        let request = Request::get(Url::parse("http://127.0.0.1:9/css/style.css").unwrap());
        let err = network.fetch(&request).await.unwrap_err();
        match err {
            NetworkError::Offline(url) => assert_eq!(url, "http://127.0.0.1:9/css/style.css"),
            other => panic!("expected offline, got {other:?}"),
        }
    }
}

use thiserror::Error;

use crate::worker::WorkerState;

/// Failure of the network substrate.
///
/// An HTTP error status is not a failure: it arrives as a regular response.
/// Only transport-level problems end up here.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Network unreachable: {0}")]
    Offline(String),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl NetworkError {
    /// Classify a reqwest error for the given URL
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            NetworkError::Timeout(url.to_string())
        } else if source.is_connect() {
            NetworkError::Offline(url.to_string())
        } else {
            NetworkError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache entry: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request method {0} cannot be cached")]
    UnsupportedMethod(String),
}

impl StorageError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Cannot {signal} while worker is {actual}")]
    InvalidState {
        signal: &'static str,
        actual: WorkerState,
    },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to show notification: {0}")]
    Notification(String),
}

//! Error types for the map location cache.
//!
//! Failures are grouped by where they surface: startup and configuration
//! errors stop the process, fetch-family errors are recovered by the refresh
//! coordinator, and encode errors only affect the single response being built.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the map location cache.
#[derive(Debug, Error)]
pub enum MapCacheError {
    // Startup errors
    #[error("Storage backend unavailable at startup: {message}")]
    Startup { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // Fetch errors
    #[error("Failed to fetch map data: {message}")]
    Fetch {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to decode map data: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Response errors
    #[error("Failed to encode map data as JSON: {message}")]
    Encode {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Store write errors
    #[error("Failed to write map data: {message}")]
    Write {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },
}

/// Result type alias for map cache operations.
pub type Result<T> = std::result::Result<T, MapCacheError>;

impl From<std::io::Error> for MapCacheError {
    fn from(err: std::io::Error) -> Self {
        MapCacheError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for MapCacheError {
    fn from(err: rusqlite::Error) -> Self {
        MapCacheError::Fetch {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for MapCacheError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest does not report which deadline expired, so timeouts stay here
        // rather than becoming `Timeout`
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            err.to_string()
        };
        MapCacheError::Network {
            message,
            source: Some(err),
        }
    }
}

impl MapCacheError {
    /// Create a decode error for a malformed backend document.
    pub fn decode(err: serde_json::Error, context: impl std::fmt::Display) -> Self {
        MapCacheError::Decode {
            message: format!("{}: {}", context, err),
            source: Some(err),
        }
    }

    /// Create a write error for a failed collection update.
    pub fn write(err: rusqlite::Error) -> Self {
        MapCacheError::Write {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an encode error for a response body that failed to serialize.
    pub fn encode(err: serde_json::Error) -> Self {
        MapCacheError::Encode {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Whether this error came out of a backend fetch.
    ///
    /// Connectivity failures, timeouts and undecodable documents are all
    /// handled the same way: the snapshot is left alone and the failure is
    /// logged (periodic refresh) or reported to the requester (cold fill).
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            MapCacheError::Fetch { .. }
                | MapCacheError::Network { .. }
                | MapCacheError::Timeout(_)
                | MapCacheError::Decode { .. }
        )
    }

    /// Whether this error must stop the process before it starts serving.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MapCacheError::Startup { .. } | MapCacheError::Config { .. }
        )
    }

    /// Message safe to show to an HTTP client.
    ///
    /// Backend details stay in the logs; the requester only learns which
    /// stage failed.
    pub fn public_message(&self) -> &'static str {
        match self {
            MapCacheError::Fetch { .. }
            | MapCacheError::Network { .. }
            | MapCacheError::Timeout(_) => "Failed to fetch map data",
            MapCacheError::Decode { .. } => "Failed to decode map data",
            MapCacheError::Encode { .. } => "Failed to encode map data as JSON",
            _ => "Internal server error",
        }
    }
}

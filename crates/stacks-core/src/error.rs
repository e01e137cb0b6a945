//! Error types for the Stacks pipeline core.
//!
//! One error enum covers the whole pipeline so that failed records are
//! distinguishable from records with no detection, and so the retry layer
//! can classify transient remote failures.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Stacks operations.
#[derive(Debug, Error)]
pub enum StacksError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Rate limited by {service}, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Remote returned HTTP {status} for query '{query}'")]
    RemoteStatus { status: u16, query: String },

    #[error("Malformed response for query '{query}': {message}")]
    MalformedResponse { query: String, message: String },

    // Database errors
    #[error("Database error: {message}")]
    Database {
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

    /// The curated database could not be written safely. The session must
    /// terminate with exit code 2; any existing backup is preserved.
    #[error("Curated database write failed at {path}: {message}")]
    CuratedWrite { message: String, path: PathBuf },

    #[error("Backup of {path} failed: {message}")]
    BackupFailed { message: String, path: PathBuf },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors (fail fast, before the first remote request)
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    // Validation errors (bad user-supplied values, fail fast)
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Session cancelled")]
    Cancelled,
}

/// Result type alias for Stacks operations.
pub type Result<T> = std::result::Result<T, StacksError>;

// Conversion implementations for common error types

impl From<std::io::Error> for StacksError {
    fn from(err: std::io::Error) -> Self {
        StacksError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for StacksError {
    fn from(err: serde_json::Error) -> Self {
        StacksError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for StacksError {
    fn from(err: rusqlite::Error) -> Self {
        StacksError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for StacksError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StacksError::Timeout(std::time::Duration::from_secs(0))
        } else {
            StacksError::Network {
                message: err.to_string(),
                cause: Some(err.to_string()),
            }
        }
    }
}

impl StacksError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        StacksError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Check if this error should trigger a retry.
    ///
    /// Transient remote errors (transport failures, timeouts, 5xx) are
    /// retryable. 429 is handled separately by the harvester so that the
    /// pushback sleep does not consume a retry attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            StacksError::Network { .. } | StacksError::Timeout(_) => true,
            StacksError::RemoteStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Process exit code for the harvest runner.
    ///
    /// `0` success, `1` configuration error, `2` irrecoverable I/O during a
    /// curated-database write.
    pub fn exit_code(&self) -> i32 {
        match self {
            StacksError::Config { .. }
            | StacksError::Validation { .. }
            | StacksError::UnknownStrategy(_) => 1,
            StacksError::CuratedWrite { .. } | StacksError::BackupFailed { .. } => 2,
            _ => 1,
        }
    }
}

//! Memory error types.

use thiserror::Error;

/// Errors that can occur during memory operations.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Embedding generation failed.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The vector store answered with a non-success status.
    #[error("Vector store error ({status}): {message}")]
    Store { status: u16, message: String },

    /// Entry not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MemoryError {
    /// Build a store error from an HTTP status and response body.
    pub fn store(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            body
        };
        Self::Store {
            status: status.as_u16(),
            message,
        }
    }
}

impl From<pinemem_core::ConfigError> for MemoryError {
    fn from(e: pinemem_core::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

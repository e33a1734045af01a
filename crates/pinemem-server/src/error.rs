//! Server error types.

use pinemem_core::ConfigError;
use pinemem_memory::MemoryError;
use thiserror::Error;

/// Errors that can occur in the tool server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend could not be initialized.
    #[error("Backend error: {0}")]
    Backend(#[from] MemoryError),

    /// Malformed JSON-RPC request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Method not found.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Get the JSON-RPC error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Json(_) => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            _ => -32603,
        }
    }
}

//! # pinemem-core
//!
//! Shared building blocks for the pinemem memory server.
//!
//! - **Configuration**: json5 config file, environment overrides, validation
//! - **Paths**: base directory, config file, local index file, desktop client config
//! - **Utilities**: memory id generation, environment helpers, secret strings

pub mod config;
pub mod env;
pub mod error;
pub mod id;
pub mod paths;
pub mod secret;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use secret::SecretString;

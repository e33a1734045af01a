//! Configuration schema definitions.

use crate::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main pinemem configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Vector database settings.
    #[serde(default)]
    pub pinecone: PineconeConfig,

    /// Embedding provider settings.
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Local side-index settings.
    #[serde(default)]
    pub index: LocalIndexConfig,

    /// Tool server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Pinecone configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PineconeConfig {
    /// API key. Usually supplied via `PINECONE_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Index name.
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Namespace inside the index.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Data-plane host. Discovered from the control plane when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Control-plane base URL.
    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,

    /// Vector dimension used when creating the index.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Similarity metric used when creating the index.
    #[serde(default)]
    pub metric: Metric,

    /// Serverless cloud.
    #[serde(default = "default_cloud")]
    pub cloud: String,

    /// Serverless region.
    #[serde(default = "default_region")]
    pub region: String,

    /// Create the index at startup when it does not exist.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: default_index_name(),
            namespace: default_namespace(),
            host: None,
            control_plane_url: default_control_plane_url(),
            dimension: default_dimension(),
            metric: Metric::default(),
            cloud: default_cloud(),
            region: default_region(),
            create_if_missing: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Similarity metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl Metric {
    /// Wire name of the metric.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Dotproduct => "dotproduct",
        }
    }
}

/// Embeddings configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// API key. Usually supplied via `OPENAI_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Embedding model.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API base URL (OpenAI-compatible).
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// What to return when the provider is unavailable.
    #[serde(default)]
    pub fallback: EmbeddingFallback,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_embedding_model(),
            base_url: default_embedding_base_url(),
            fallback: EmbeddingFallback::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Fallback vector kind when the embedding provider fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingFallback {
    /// Deterministic pseudo-vector derived from the text.
    #[default]
    Pseudo,
    /// All-zero vector.
    Zero,
}

/// Local side-index configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalIndexConfig {
    /// Index file path. Defaults to `~/.pinemem/memory_ids.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Tool server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server name reported during the MCP handshake.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Default `limit` for listing memories.
    #[serde(default = "default_list_limit")]
    pub default_list_limit: usize,

    /// Default `top_k` for recall.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            default_list_limit: default_list_limit(),
            default_top_k: default_top_k(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Filter directive for `tracing_subscriber::EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

fn default_index_name() -> String {
    "memory-index".to_string()
}

fn default_namespace() -> String {
    "memories".to_string()
}

fn default_control_plane_url() -> String {
    "https://api.pinecone.io".to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_cloud() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_server_name() -> String {
    "pinecone-memory-server".to_string()
}

fn default_list_limit() -> usize {
    10
}

fn default_top_k() -> usize {
    5
}

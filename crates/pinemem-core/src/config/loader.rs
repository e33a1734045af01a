//! Configuration loading and persistence.

use super::Config;
use crate::env::{self, vars};
use crate::error::ConfigError;
use crate::paths;
use crate::secret::SecretString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Upper bound Pinecone accepts for `topK`.
const MAX_TOP_K: usize = 10_000;

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Load from `path` (or the default path), falling back to defaults when
    /// no file exists, then apply environment overrides.
    ///
    /// A config file that exists but does not parse is an error.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => paths::config_file()?,
        };
        let config = match Self::load(&path) {
            Ok(config) => {
                debug!("Loaded configuration from {}", path.display());
                config
            }
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => return Err(e),
        };
        Ok(config.with_env_overrides())
    }

    /// Apply environment variable overrides on top of file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(key) = env::get_var(vars::PINECONE_API_KEY) {
            self.pinecone.api_key = Some(SecretString::new(key));
        }
        if let Some(name) = env::get_var(vars::PINECONE_INDEX_NAME) {
            self.pinecone.index_name = name;
        }
        if let Some(host) = env::get_var(vars::PINECONE_INDEX_HOST) {
            self.pinecone.host = Some(host);
        }
        if let Some(ns) = env::get_var(vars::PINEMEM_NAMESPACE) {
            self.pinecone.namespace = ns;
        }
        if let Some(key) = env::get_var(vars::OPENAI_API_KEY) {
            self.embeddings.api_key = Some(SecretString::new(key));
        }
        if let Some(url) = env::get_var(vars::OPENAI_BASE_URL) {
            self.embeddings.base_url = url;
        }
        if let Some(path) = env::get_var(vars::PINEMEM_INDEX_FILE) {
            self.index.path = Some(paths::expand_tilde(&path));
        }
        self
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = paths::temp_sibling(path);
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; plain JSON is valid JSON5
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// A copy with every secret replaced by a placeholder, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.pinecone.api_key.is_some() {
            copy.pinecone.api_key = Some(SecretString::new("[REDACTED]"));
        }
        if copy.embeddings.api_key.is_some() {
            copy.embeddings.api_key = Some(SecretString::new("[REDACTED]"));
        }
        copy
    }

    /// The Pinecone API key, or a configuration error naming the variable.
    pub fn pinecone_api_key(&self) -> Result<&SecretString, ConfigError> {
        self.pinecone
            .api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingCredential(vars::PINECONE_API_KEY))
    }

    /// Resolved path of the local side-index file.
    pub fn index_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.index.path {
            Some(path) => Ok(path.clone()),
            None => paths::index_file(),
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        // Pinecone index names: lowercase alphanumerics and hyphens, max 45
        let name = &self.pinecone.index_name;
        if name.is_empty() {
            errors.push("Pinecone index_name must not be empty".to_string());
        } else if name.len() > 45
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            errors.push(format!(
                "Invalid Pinecone index_name '{}': use lowercase letters, digits and '-' (max 45)",
                name
            ));
        }

        if self.pinecone.namespace.is_empty() {
            errors.push("Pinecone namespace must not be empty".to_string());
        }
        if self.pinecone.dimension == 0 {
            errors.push("Pinecone dimension must be greater than 0".to_string());
        }
        if self.pinecone.timeout_secs == 0 {
            errors.push("Pinecone timeout_secs must be greater than 0".to_string());
        }
        if self.embeddings.model.is_empty() {
            errors.push("Embedding model must not be empty".to_string());
        }
        if self.embeddings.timeout_secs == 0 {
            errors.push("Embedding timeout_secs must be greater than 0".to_string());
        }

        if self.server.default_list_limit == 0 {
            errors.push("Server default_list_limit must be greater than 0".to_string());
        }
        if self.server.default_top_k == 0 {
            errors.push("Server default_top_k must be greater than 0".to_string());
        }
        if self.server.default_top_k > MAX_TOP_K {
            errors.push(format!(
                "Server default_top_k {} exceeds maximum of {}",
                self.server.default_top_k, MAX_TOP_K
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

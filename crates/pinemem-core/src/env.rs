//! Environment variable handling.

use std::env;
use std::path::Path;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Load `KEY=value` pairs from `.env` in the working directory.
///
/// Variables already present in the process environment win.
pub fn load_dotenv() -> Result<usize, std::io::Error> {
    load_dotenv_from(Path::new(".env"))
}

/// Load `KEY=value` pairs from the given file, returning how many were set.
pub fn load_dotenv_from(path: &Path) -> Result<usize, std::io::Error> {
    if !path.exists() {
        return Ok(0);
    }

    let content = std::fs::read_to_string(path)?;
    let mut loaded = 0;
    for (key, value) in parse_dotenv(&content) {
        if env::var(&key).is_err() {
            env::set_var(&key, &value);
            loaded += 1;
        }
    }
    Ok(loaded)
}

/// Parse dotenv content into key/value pairs.
///
/// Placeholder values copied from an example file (`your-...`) are skipped.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().trim_start_matches("export ").trim();
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);

        if key.is_empty() || value.is_empty() || value.starts_with("your-") {
            continue;
        }
        pairs.push((key.to_string(), value.to_string()));
    }
    pairs
}

/// Environment variable names understood by pinemem.
pub mod vars {
    /// Pinecone API key (required unless running offline).
    pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";

    /// Pinecone index name override.
    pub const PINECONE_INDEX_NAME: &str = "PINECONE_INDEX_NAME";

    /// Pinecone data-plane host; skips index discovery when set.
    pub const PINECONE_INDEX_HOST: &str = "PINECONE_INDEX_HOST";

    /// API key for the embedding provider.
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

    /// Base URL for an OpenAI-compatible embedding API.
    pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";

    /// Vector store namespace override.
    pub const PINEMEM_NAMESPACE: &str = "PINEMEM_NAMESPACE";

    /// Local index file override.
    pub const PINEMEM_INDEX_FILE: &str = "PINEMEM_INDEX_FILE";

    /// Base directory override.
    pub const PINEMEM_HOME: &str = "PINEMEM_HOME";

    /// Config file override.
    pub const PINEMEM_CONFIG: &str = "PINEMEM_CONFIG";

    /// Log filter.
    pub const PINEMEM_LOG: &str = "PINEMEM_LOG";
}

//! Path resolution utilities.

use crate::env::{self, vars};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Name under which the server is registered in desktop client configs.
pub const DESKTOP_SERVER_KEY: &str = "pinecone-memory";

/// Get the pinemem base directory (`$PINEMEM_HOME` or `~/.pinemem`).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = env::get_var(vars::PINEMEM_HOME) {
        return Ok(expand_tilde(&home));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".pinemem"))
}

/// Get the main config file path (`$PINEMEM_CONFIG` or `~/.pinemem/pinemem.json5`).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    if let Some(path) = env::get_var(vars::PINEMEM_CONFIG) {
        return Ok(expand_tilde(&path));
    }
    Ok(base_dir()?.join("pinemem.json5"))
}

/// Get the default local index file path (`~/.pinemem/memory_ids.json`).
pub fn index_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("memory_ids.json"))
}

/// Get the desktop MCP client config file for this platform.
///
/// macOS: `~/Library/Application Support/Claude/claude_desktop_config.json`,
/// Windows: `%APPDATA%\Claude\claude_desktop_config.json`,
/// Linux: `~/.config/Claude/claude_desktop_config.json`.
pub fn desktop_config_file() -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine desktop client config location".to_string())
    })?;
    Ok(dir.join("Claude").join("claude_desktop_config.json"))
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Sibling path used for write-then-rename.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

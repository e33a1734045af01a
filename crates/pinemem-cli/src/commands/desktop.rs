//! Desktop MCP client registration.
//!
//! Edits `mcpServers.pinecone-memory` in the client's
//! `claude_desktop_config.json`, leaving every other key untouched.

use crate::render::{self, Status};
use anyhow::Context;
use clap::Args;
use pinemem_core::env::vars;
use pinemem_core::paths::{self, DESKTOP_SERVER_KEY};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Desktop command arguments.
#[derive(Args)]
pub struct DesktopArgs {
    #[command(subcommand)]
    pub command: DesktopCommand,
}

#[derive(clap::Subcommand)]
pub enum DesktopCommand {
    /// Register the memory server
    Install {
        /// Register the server in offline mode
        #[arg(long)]
        offline: bool,

        /// Copy API keys from the current configuration into the entry's env
        #[arg(long)]
        with_credentials: bool,

        /// Client config file (defaults to the per-OS location)
        #[arg(long)]
        client_config: Option<PathBuf>,
    },

    /// Unregister the memory server
    Remove {
        /// Client config file (defaults to the per-OS location)
        #[arg(long)]
        client_config: Option<PathBuf>,
    },

    /// Show whether the memory server is registered
    Status {
        /// Client config file (defaults to the per-OS location)
        #[arg(long)]
        client_config: Option<PathBuf>,
    },
}

/// Run the desktop command.
pub async fn run(args: DesktopArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        DesktopCommand::Install {
            offline,
            with_credentials,
            client_config,
        } => {
            let path = client_config_path(client_config)?;
            let exe = std::env::current_exe().context("Could not locate the pinemem binary")?;

            let mut env = Vec::new();
            if let Some(config_path) = config_path {
                env.push((vars::PINEMEM_CONFIG, config_path.display().to_string()));
            }
            if with_credentials {
                let config = crate::load_config(config_path)?;
                if let Ok(key) = config.pinecone_api_key() {
                    env.push((vars::PINECONE_API_KEY, key.expose_secret().to_string()));
                }
                if let Some(key) = config.embeddings.api_key.as_ref().filter(|k| !k.is_empty()) {
                    env.push((vars::OPENAI_API_KEY, key.expose_secret().to_string()));
                }
            }

            let replaced = install(&path, server_entry(&exe, offline, &env))?;
            let verb = if replaced { "Updated" } else { "Registered" };
            render::status_line(
                Status::Ok,
                format!("{} '{}' in {}", verb, DESKTOP_SERVER_KEY, path.display()),
            );
            println!("  Restart the desktop client to pick up the change.");
        }

        DesktopCommand::Remove { client_config } => {
            let path = client_config_path(client_config)?;
            if remove(&path)? {
                render::status_line(
                    Status::Ok,
                    format!("Removed '{}' from {}", DESKTOP_SERVER_KEY, path.display()),
                );
            } else {
                render::status_line(
                    Status::Warn,
                    format!("'{}' is not registered in {}", DESKTOP_SERVER_KEY, path.display()),
                );
            }
        }

        DesktopCommand::Status { client_config } => {
            let path = client_config_path(client_config)?;
            match registered(&path)? {
                Some(entry) => {
                    render::status_line(
                        Status::Ok,
                        format!("'{}' is registered in {}", DESKTOP_SERVER_KEY, path.display()),
                    );
                    println!("{}", serde_json::to_string_pretty(&redact_env(entry))?);
                }
                None => render::status_line(
                    Status::Warn,
                    format!("'{}' is not registered in {}", DESKTOP_SERVER_KEY, path.display()),
                ),
            }
        }
    }

    Ok(())
}

fn client_config_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(paths::desktop_config_file()?),
    }
}

/// The `mcpServers` entry that launches `pinemem serve`.
pub fn server_entry(command: &Path, offline: bool, env: &[(&str, String)]) -> Value {
    let mut args = vec!["serve"];
    if offline {
        args.push("--offline");
    }

    let mut entry = json!({
        "command": command.display().to_string(),
        "args": args,
    });
    if !env.is_empty() {
        let env: Map<String, Value> = env
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect();
        entry["env"] = Value::Object(env);
    }
    entry
}

/// Read the client config. A missing file reads as an empty object.
pub fn read_client_config(path: &Path) -> anyhow::Result<Value> {
    if !path.exists() {
        return Ok(json!({}));
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(json!({}));
    }
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    if !value.is_object() {
        anyhow::bail!("{} does not contain a JSON object", path.display());
    }
    Ok(value)
}

fn write_client_config(path: &Path, value: &Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = paths::temp_sibling(path);
    fs::write(&temp_path, serde_json::to_string_pretty(value)?)?;
    fs::rename(&temp_path, path)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Insert or replace the server entry. Returns `true` if one was replaced.
pub fn install(path: &Path, entry: Value) -> anyhow::Result<bool> {
    let mut config = read_client_config(path)?;
    let Some(root) = config.as_object_mut() else {
        anyhow::bail!("{} does not contain a JSON object", path.display());
    };

    let servers = root
        .entry("mcpServers")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(servers) = servers.as_object_mut() else {
        anyhow::bail!("'mcpServers' in {} is not an object", path.display());
    };
    let replaced = servers
        .insert(DESKTOP_SERVER_KEY.to_string(), entry)
        .is_some();

    write_client_config(path, &config)?;
    Ok(replaced)
}

/// Remove the server entry. Returns `false` if it was not present; the
/// file is left untouched in that case.
pub fn remove(path: &Path) -> anyhow::Result<bool> {
    let mut config = read_client_config(path)?;
    let removed = config
        .get_mut("mcpServers")
        .and_then(Value::as_object_mut)
        .and_then(|servers| servers.remove(DESKTOP_SERVER_KEY))
        .is_some();

    if removed {
        write_client_config(path, &config)?;
    }
    Ok(removed)
}

/// The registered server entry, if any.
pub fn registered(path: &Path) -> anyhow::Result<Option<Value>> {
    let config = read_client_config(path)?;
    Ok(config
        .get("mcpServers")
        .and_then(|servers| servers.get(DESKTOP_SERVER_KEY))
        .cloned())
}

fn redact_env(mut entry: Value) -> Value {
    if let Some(env) = entry.get_mut("env").and_then(Value::as_object_mut) {
        for (key, value) in env.iter_mut() {
            if key.ends_with("_API_KEY") {
                *value = Value::String("[REDACTED]".to_string());
            }
        }
    }
    entry
}

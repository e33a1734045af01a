//! Configuration management commands.

use clap::Args;
use pinemem_core::{paths, Config, ConfigError};
use std::path::{Path, PathBuf};

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration with secrets redacted
    Show,

    /// Show configuration file path
    Path,

    /// Write a configuration file with default values
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Validate configuration
    Validate,
}

fn config_file(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(paths::config_file()?),
    }
}

/// Run the config command.
pub async fn run(args: ConfigArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = crate::load_config(config_path)?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }

        ConfigCommand::Path => {
            println!("{}", config_file(config_path)?.display());
        }

        ConfigCommand::Init { force } => {
            let path = config_file(config_path)?;
            init(&path, force)?;
            println!("Created config file: {}", path.display());
            println!("  Set PINECONE_API_KEY (and optionally OPENAI_API_KEY) before 'pinemem serve'.");
        }

        ConfigCommand::Validate => {
            let path = config_file(config_path)?;
            let config = match Config::load(&path) {
                Ok(config) => config.with_env_overrides(),
                Err(ConfigError::NotFound(_)) => Config::default().with_env_overrides(),
                Err(e) => anyhow::bail!("Failed to load config: {}", e),
            };
            match config.validate() {
                Ok(()) => println!("Configuration is valid"),
                Err(e) => anyhow::bail!("Configuration error: {}", e),
            }
        }
    }

    Ok(())
}

/// Write the defaults to `path`. Secrets are never written; they come from
/// the environment.
fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }
    Config::default().save(path)?;
    Ok(())
}

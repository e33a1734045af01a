//! pinemem command-line interface.

pub mod commands;
pub mod render;

use clap::{Parser, Subcommand};
use pinemem_core::config::LogLevel;
use pinemem_core::Config;
use std::path::{Path, PathBuf};

/// pinemem - long-term memory for MCP clients, backed by Pinecone
#[derive(Parser)]
#[command(name = "pinemem")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "PINEMEM_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the MCP memory server on stdin/stdout
    Serve(commands::serve::ServeArgs),

    /// Store a memory
    Remember(commands::memory::RememberArgs),

    /// List stored memories
    List(commands::memory::ListArgs),

    /// Recall memories similar to a query
    Recall(commands::memory::RecallArgs),

    /// Delete a memory by id
    Forget(commands::memory::ForgetArgs),

    /// Search the local index by keyword (no network)
    Search(commands::memory::SearchArgs),

    /// Show local index and vector store statistics
    Stats,

    /// Register the server with the desktop MCP client
    Desktop(commands::desktop::DesktopArgs),

    /// Run diagnostics
    Doctor(commands::doctor::DoctorArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Default log directive when neither `PINEMEM_LOG` nor `RUST_LOG` is set.
///
/// Each `-v` raises the configured level by one step, up to `trace`.
pub fn log_directive(verbose: u8, level: LogLevel) -> String {
    let level = match verbose {
        0 => level,
        1 => match level {
            LogLevel::Error | LogLevel::Warn => LogLevel::Info,
            LogLevel::Info => LogLevel::Debug,
            LogLevel::Debug | LogLevel::Trace => LogLevel::Trace,
        },
        _ => LogLevel::Trace,
    };
    format!("pinemem={}", level.as_str())
}

/// Resolve configuration from `path` (or the default location) plus the
/// environment.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    Ok(Config::resolve(path)?)
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, load_config(config_path)?).await,
        Commands::Remember(args) => {
            commands::memory::remember(args, load_config(config_path)?).await
        }
        Commands::List(args) => commands::memory::list(args, load_config(config_path)?).await,
        Commands::Recall(args) => commands::memory::recall(args, load_config(config_path)?).await,
        Commands::Forget(args) => commands::memory::forget(args, load_config(config_path)?).await,
        Commands::Search(args) => commands::memory::search(args, load_config(config_path)?).await,
        Commands::Stats => commands::memory::stats(load_config(config_path)?).await,
        Commands::Desktop(args) => commands::desktop::run(args, config_path).await,
        Commands::Doctor(args) => commands::doctor::run(args, config_path).await,
        Commands::Config(args) => commands::config::run(args, config_path).await,
        Commands::Version => {
            println!("pinemem {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

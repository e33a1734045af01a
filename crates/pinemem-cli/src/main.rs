//! pinemem CLI entry point.

use clap::Parser;
use pinemem_cli::{load_config, log_directive, run, Cli};
use pinemem_core::env::{self, vars};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` first so clap's `env` fallbacks see its values
    let dotenv = env::load_dotenv();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Logging goes to stderr; stdout carries protocol frames under `serve`
    let logging = load_config(cli.config.as_deref())
        .map(|config| config.logging)
        .unwrap_or_default();
    let filter = EnvFilter::try_from_env(vars::PINEMEM_LOG)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(log_directive(cli.verbose, logging.level)));
    let (json_layer, text_layer) = if logging.json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stderr)))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    match dotenv {
        Ok(0) => {}
        Ok(n) => tracing::debug!("Loaded {} variable(s) from .env", n),
        Err(e) => tracing::warn!("Could not read .env: {}", e),
    }

    // Run the command
    run(cli).await
}

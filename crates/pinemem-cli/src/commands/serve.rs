//! Serve command.

use anyhow::Context;
use clap::Args;
use pinemem_core::Config;
use pinemem_server::{serve_stdio, McpServer, MemoryService, ServerInfo, ToolRegistry};
use std::sync::Arc;
use tracing::warn;

/// Serve command arguments.
#[derive(Args)]
pub struct ServeArgs {
    /// Use an in-process vector store and pseudo embeddings; no credentials needed
    #[arg(long)]
    pub offline: bool,
}

/// Build the service, then serve MCP on stdin/stdout until EOF.
///
/// Configuration errors surface here, before any input is read.
pub async fn run(args: ServeArgs, config: Config) -> anyhow::Result<()> {
    let service = if args.offline {
        warn!("Offline mode: vectors live in memory and are lost on exit");
        MemoryService::offline(&config)?
    } else {
        MemoryService::connect(&config)
            .await
            .context("Failed to start the memory server")?
    };

    let tools = ToolRegistry::with_memory_tools(Arc::new(service));
    let server = McpServer::new(tools, ServerInfo::new(config.server.name.clone()));
    serve_stdio(Arc::new(server)).await?;
    Ok(())
}

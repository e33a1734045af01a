//! One-shot memory commands.
//!
//! `remember`, `list` and `recall` run the same service operations the MCP
//! tools do and print the same text. `search` reads the local index only.

use crate::render::{self, Status};
use anyhow::Context;
use clap::Args;
use pinemem_core::{id, Config};
use pinemem_memory::{Category, LocalIndex};
use pinemem_server::render as text;
use pinemem_server::MemoryService;

/// Remember command arguments.
#[derive(Args)]
pub struct RememberArgs {
    /// Text to remember
    pub text: String,

    /// Additional context stored alongside the memory
    #[arg(long)]
    pub context: Option<String>,
}

/// List command arguments.
#[derive(Args)]
pub struct ListArgs {
    /// Only show memories in this category
    #[arg(long)]
    pub category: Option<Category>,

    /// Maximum number of memories to show
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Recall command arguments.
#[derive(Args)]
pub struct RecallArgs {
    /// What to look for
    pub query: String,

    /// Number of memories to return
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,
}

/// Forget command arguments.
#[derive(Args)]
pub struct ForgetArgs {
    /// Memory id (mem_...)
    pub id: String,
}

/// Search command arguments.
#[derive(Args)]
pub struct SearchArgs {
    /// Keyword to look for
    pub term: String,
}

async fn connect(config: &Config) -> anyhow::Result<MemoryService> {
    MemoryService::connect(config)
        .await
        .context("Failed to connect to the vector store")
}

pub async fn remember(args: RememberArgs, config: Config) -> anyhow::Result<()> {
    let service = connect(&config).await?;
    println!("{}", remember_with(&service, &args).await?);
    Ok(())
}

pub async fn list(args: ListArgs, config: Config) -> anyhow::Result<()> {
    let service = connect(&config).await?;
    println!("{}", list_with(&service, &args).await?);
    Ok(())
}

pub async fn recall(args: RecallArgs, config: Config) -> anyhow::Result<()> {
    let service = connect(&config).await?;
    println!("{}", recall_with(&service, &args).await?);
    Ok(())
}

pub async fn forget(args: ForgetArgs, config: Config) -> anyhow::Result<()> {
    if !id::is_memory_id(&args.id) {
        render::status_line(
            Status::Warn,
            format!("'{}' does not look like a memory id (mem_...)", args.id),
        );
    }
    let service = connect(&config).await?;
    if service.forget(&args.id).await? {
        render::status_line(Status::Ok, format!("Forgot {}", args.id));
    } else {
        render::status_line(
            Status::Warn,
            format!(
                "{} was not in the local index; deleted from the vector store only",
                args.id
            ),
        );
    }
    Ok(())
}

pub async fn search(args: SearchArgs, config: Config) -> anyhow::Result<()> {
    let index = LocalIndex::new(config.index_path()?);
    let hits = index.find_by_keyword(&args.term).await;
    if hits.is_empty() {
        println!("No memories mention '{}'", args.term);
        return Ok(());
    }

    println!("{} memories mention '{}':\n", hits.len(), args.term);
    for hit in &hits {
        println!("{}", render::search_hit(hit));
    }
    Ok(())
}

/// Local stats always; vector store stats when the store can be reached.
pub async fn stats(config: Config) -> anyhow::Result<()> {
    match connect(&config).await {
        Ok(service) => {
            let stats = service.stats().await;
            render::heading("Local index");
            println!("{}", render::local_stats(&stats.local));
            render::heading(&format!("Vector store ({})", stats.backend));
            match stats.store {
                Ok(store) => println!("{}", render::store_stats(&store)),
                Err(e) => render::status_line(Status::Error, e),
            }
        }
        Err(e) => {
            let index = LocalIndex::new(config.index_path()?);
            render::heading("Local index");
            println!("{}", render::local_stats(&index.stats().await));
            render::heading("Vector store");
            render::status_line(Status::Warn, format!("{:#}", e));
        }
    }
    Ok(())
}

async fn remember_with(service: &MemoryService, args: &RememberArgs) -> anyhow::Result<String> {
    let stored = service
        .remember(&args.text, args.context.as_deref())
        .await?;
    Ok(text::stored(&stored))
}

async fn list_with(service: &MemoryService, args: &ListArgs) -> anyhow::Result<String> {
    let limit = args.limit.unwrap_or(service.default_list_limit());
    let listing = service.list(args.category, limit).await?;
    Ok(text::listing(&listing))
}

async fn recall_with(service: &MemoryService, args: &RecallArgs) -> anyhow::Result<String> {
    let top_k = args.top_k.unwrap_or(service.default_top_k());
    let result = service.recall(&args.query, top_k).await?;
    Ok(text::recall(&result))
}

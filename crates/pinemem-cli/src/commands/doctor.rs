//! Diagnostic commands.

use crate::render::{self, Status};
use clap::Args;
use console::style;
use pinemem_core::env::{self, vars};
use pinemem_core::{paths, Config, ConfigError};
use pinemem_memory::index::is_corrupt;
use pinemem_memory::{IndexFile, LocalIndex};
use pinemem_server::MemoryService;
use std::path::Path;

/// Doctor command arguments.
#[derive(Args)]
pub struct DoctorArgs {
    /// Also contact the vector store
    #[arg(long)]
    pub full: bool,
}

#[derive(Default)]
struct Tally {
    errors: usize,
    warnings: usize,
}

impl Tally {
    fn report(&mut self, status: Status, message: impl std::fmt::Display) {
        match status {
            Status::Ok => {}
            Status::Warn => self.warnings += 1,
            Status::Error => self.errors += 1,
        }
        render::status_line(status, message);
    }
}

/// Run the doctor command.
pub async fn run(args: DoctorArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("pinemem doctor");

    let mut tally = Tally::default();

    render::heading("Configuration");
    let file = match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => paths::config_file(),
    };
    match &file {
        Ok(path) => match Config::load(path) {
            Ok(_) => tally.report(Status::Ok, format!("Loaded {}", path.display())),
            Err(ConfigError::NotFound(_)) => {
                tally.report(
                    Status::Warn,
                    format!("No config file at {}; using defaults", path.display()),
                );
                println!("    Run 'pinemem config init' to create one");
            }
            Err(e) => tally.report(Status::Error, format!("Configuration error: {}", e)),
        },
        Err(e) => tally.report(Status::Error, format!("Config location unknown: {}", e)),
    }

    let config = match crate::load_config(config_path) {
        Ok(config) => config,
        Err(_) => Config::default().with_env_overrides(),
    };
    match config.validate() {
        Ok(()) => tally.report(Status::Ok, "Configuration valid"),
        Err(e) => tally.report(Status::Error, format!("Configuration invalid: {}", e)),
    }

    render::heading("Credentials");
    match config.pinecone_api_key() {
        Ok(key) => tally.report(
            Status::Ok,
            format!("{} is set ({})", vars::PINECONE_API_KEY, key.hint()),
        ),
        Err(e) => {
            tally.report(Status::Error, e);
            println!("    'pinemem serve --offline' runs without it");
        }
    }
    match config.embeddings.api_key.as_ref().filter(|k| !k.is_empty()) {
        Some(key) => tally.report(
            Status::Ok,
            format!("{} is set ({})", vars::OPENAI_API_KEY, key.hint()),
        ),
        None => tally.report(
            Status::Warn,
            format!(
                "{} not set; embeddings fall back to {:?} vectors",
                vars::OPENAI_API_KEY,
                config.embeddings.fallback
            ),
        ),
    }
    if env::get_var(vars::PINECONE_INDEX_HOST).is_some() {
        tally.report(
            Status::Ok,
            format!("{} set; control plane skipped", vars::PINECONE_INDEX_HOST),
        );
    }

    render::heading("Local index");
    match config.index_path() {
        Ok(path) => {
            let (status, message) = check_index(&path).await;
            tally.report(status, message);
        }
        Err(e) => tally.report(Status::Error, format!("Index location unknown: {}", e)),
    }

    render::heading("Desktop client");
    match paths::desktop_config_file() {
        Ok(path) => match super::desktop::registered(&path) {
            Ok(Some(_)) => tally.report(Status::Ok, format!("Registered in {}", path.display())),
            Ok(None) => {
                tally.report(Status::Warn, format!("Not registered in {}", path.display()));
                println!("    Run 'pinemem desktop install' to register");
            }
            Err(e) => tally.report(Status::Error, format!("{:#}", e)),
        },
        Err(e) => tally.report(Status::Warn, format!("Client config location unknown: {}", e)),
    }

    if args.full {
        render::heading("Vector store");
        match MemoryService::connect(&config).await {
            Ok(service) => {
                let stats = service.stats().await;
                match stats.store {
                    Ok(store) => tally.report(
                        Status::Ok,
                        format!(
                            "{} reachable ({} memories)",
                            stats.backend, store.total_memories
                        ),
                    ),
                    Err(e) => tally.report(Status::Error, format!("{}: {}", stats.backend, e)),
                }
            }
            Err(e) => tally.report(Status::Error, format!("Could not connect: {}", e)),
        }
    }

    // Summary
    render::heading("Summary");
    println!(
        "  Errors: {}",
        if tally.errors > 0 {
            style(tally.errors).red()
        } else {
            style(tally.errors).green()
        }
    );
    println!(
        "  Warnings: {}",
        if tally.warnings > 0 {
            style(tally.warnings).yellow()
        } else {
            style(tally.warnings).green()
        }
    );

    if tally.errors > 0 {
        anyhow::bail!("{} error(s) found", tally.errors);
    }

    Ok(())
}

/// Health of the local index file at `path`.
async fn check_index(path: &Path) -> (Status, String) {
    if !path.exists() {
        return (
            Status::Ok,
            format!("{} not created yet (no memories stored)", path.display()),
        );
    }

    match LocalIndex::new(path).read().await {
        Ok(file) => {
            // `read` drops inconsistent entries; compare with the raw file
            let raw = tokio::fs::read_to_string(path)
                .await
                .ok()
                .and_then(|data| serde_json::from_str::<IndexFile>(&data).ok());
            match raw {
                Some(raw)
                    if raw.ids.len() != file.ids.len()
                        || raw.records.len() != file.records.len() =>
                {
                    (
                        Status::Warn,
                        format!(
                            "{}: {} ids, {} records; {} consistent entries kept on next write",
                            path.display(),
                            raw.ids.len(),
                            raw.records.len(),
                            file.ids.len()
                        ),
                    )
                }
                _ => (
                    Status::Ok,
                    format!("{}: {} memories", path.display(), file.ids.len()),
                ),
            }
        }
        Err(e) if is_corrupt(&e) => (
            Status::Error,
            format!(
                "{} is malformed ({}); it will not be overwritten until fixed or removed",
                path.display(),
                e
            ),
        ),
        Err(e) => (
            Status::Error,
            format!("Could not read {}: {}", path.display(), e),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinemem_memory::Category;

    #[tokio::test]
    async fn test_check_index_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (status, message) = check_index(&dir.path().join("memory_ids.json")).await;
        assert!(matches!(status, Status::Ok));
        assert!(message.contains("not created yet"));
    }

    #[tokio::test]
    async fn test_check_index_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory_ids.json");
        let index = LocalIndex::new(&path);
        index
            .add("mem_a", "first", Category::General, Vec::new())
            .await;
        index
            .add("mem_b", "second", Category::Idea, Vec::new())
            .await;

        let (status, message) = check_index(&path).await;
        assert!(matches!(status, Status::Ok));
        assert!(message.ends_with("2 memories"));
    }

    #[tokio::test]
    async fn test_check_index_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory_ids.json");
        std::fs::write(&path, "{ broken").unwrap();

        let (status, message) = check_index(&path).await;
        assert!(matches!(status, Status::Error));
        assert!(message.contains("malformed"));
    }

    #[tokio::test]
    async fn test_check_index_inconsistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory_ids.json");
        std::fs::write(
            &path,
            r#"{"vector_ids":["mem_a","mem_missing"],"memories":{"mem_a":{"text":"a","category":"general","keywords":[],"created_at":"2024-01-01T00:00:00Z"}},"last_updated":"2024-01-01T00:00:00Z","total_memories":2}"#,
        )
        .unwrap();

        let (status, message) = check_index(&path).await;
        assert!(matches!(status, Status::Warn));
        assert!(message.contains("2 ids, 1 records"));
    }

    #[test]
    fn test_tally_counts() {
        let mut tally = Tally::default();
        tally.report(Status::Ok, "fine");
        tally.report(Status::Warn, "hmm");
        tally.report(Status::Error, "bad");
        tally.report(Status::Error, "worse");
        assert_eq!(tally.warnings, 1);
        assert_eq!(tally.errors, 2);
    }
}

//! Config save/load roundtrip integration tests.

use pinemem_core::config::{EmbeddingFallback, LogLevel, Metric};
use pinemem_core::{Config, SecretString};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pinemem.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.pinecone.index_name, config.pinecone.index_name);
    assert_eq!(loaded.pinecone.namespace, config.pinecone.namespace);
    assert_eq!(loaded.pinecone.dimension, config.pinecone.dimension);
    assert_eq!(loaded.pinecone.metric, Metric::Cosine);
    assert_eq!(loaded.embeddings.model, config.embeddings.model);
    assert_eq!(loaded.embeddings.fallback, EmbeddingFallback::Pseudo);
    assert_eq!(
        loaded.server.default_list_limit,
        config.server.default_list_limit
    );
    assert_eq!(loaded.server.default_top_k, config.server.default_top_k);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pinemem.json5");

    let mut config = Config::default();
    config.pinecone.index_name = "team-memories".to_string();
    config.pinecone.host = Some("team-memories-abc.svc.pinecone.io".to_string());
    config.server.default_top_k = 8;
    config.logging.level = LogLevel::Debug;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.pinecone.index_name, "team-memories");
    assert_eq!(
        loaded.pinecone.host.as_deref(),
        Some("team-memories-abc.svc.pinecone.io")
    );
    assert_eq!(loaded.server.default_top_k, 8);
    assert_eq!(loaded.logging.level, LogLevel::Debug);
}

#[test]
fn test_config_keeps_secret_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pinemem.json5");

    let mut config = Config::default();
    config.pinecone.api_key = Some(SecretString::new("pc-roundtrip"));
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.pinecone_api_key().unwrap().expose_secret(), "pc-roundtrip");
    assert!(!serde_json::to_string(&loaded.redacted())
        .unwrap()
        .contains("pc-roundtrip"));
}

#[test]
fn test_config_parses_json5() {
    let config = Config::parse(
        r#"{
            // hand-written config
            pinecone: { index_name: 'notes', namespace: 'work', },
            server: { default_list_limit: 25 },
        }"#,
    )
    .unwrap();
    assert_eq!(config.pinecone.index_name, "notes");
    assert_eq!(config.pinecone.namespace, "work");
    assert_eq!(config.server.default_list_limit, 25);
    assert_eq!(config.server.default_top_k, Config::default().server.default_top_k);
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/pinemem.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}

//! Shared fixtures for the integration tests.

use pinemem_core::Config;
use pinemem_server::{McpServer, MemoryService, ServerInfo, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Configuration rooted in a fresh temporary directory.
pub fn temp_config() -> (TempDir, Config) {
    let dir = TempDir::new().expect("tempdir");
    let mut config = Config::default();
    config.pinecone.dimension = 64;
    config.index.path = Some(dir.path().join("memory_ids.json"));
    (dir, config)
}

/// An offline MCP server built the way `pinemem serve --offline` builds it.
pub fn offline_server(config: &Config) -> Arc<McpServer> {
    let service = MemoryService::offline(config).expect("offline service");
    let tools = ToolRegistry::with_memory_tools(Arc::new(service));
    Arc::new(McpServer::new(
        tools,
        ServerInfo::new(config.server.name.clone()),
    ))
}

/// Send newline-delimited requests and collect every response line.
pub async fn exchange(server: Arc<McpServer>, lines: &[Value]) -> Vec<Value> {
    let (mut client_in, server_in) = tokio::io::duplex(256 * 1024);
    let (server_out, client_out) = tokio::io::duplex(256 * 1024);

    let task = tokio::spawn(server.run(BufReader::new(server_in), server_out));
    for line in lines {
        let mut frame = serde_json::to_vec(line).expect("serialize request");
        frame.push(b'\n');
        client_in.write_all(&frame).await.expect("write request");
    }
    drop(client_in);
    task.await.expect("server task").expect("server run");

    let mut reader = BufReader::new(client_out).lines();
    let mut responses = Vec::new();
    while let Some(line) = reader.next_line().await.expect("read response") {
        responses.push(serde_json::from_str(&line).expect("response json"));
    }
    responses
}

/// The response with the given numeric id.
pub fn response_for(responses: &[Value], id: i64) -> &Value {
    responses
        .iter()
        .find(|r| r["id"] == id)
        .unwrap_or_else(|| panic!("no response with id {}", id))
}

/// Text of the first content block of a `tools/call` result.
pub fn tool_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content")
}

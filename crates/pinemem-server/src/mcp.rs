//! MCP server over newline-delimited JSON-RPC.
//!
//! Reads one request per line, dispatches each in its own task and writes
//! responses as they complete. Notifications get no response. Stdout carries
//! protocol frames only; logs go to stderr.

use crate::error::ServerError;
use crate::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::tools::ToolRegistry;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// MCP protocol revision implemented here.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Capacity of the channel carrying responses from dispatch tasks.
const RESPONSE_CHANNEL_CAPACITY: usize = 64;

/// Name and version reported during `initialize`.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// The MCP tool server.
pub struct McpServer {
    tools: ToolRegistry,
    info: ServerInfo,
}

impl McpServer {
    pub fn new(tools: ToolRegistry, info: ServerInfo) -> Self {
        Self { tools, info }
    }

    /// Handle one request. Returns `None` for notifications.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            let id = request.id.unwrap_or(Value::Null);
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!(
                    "unsupported jsonrpc version '{}'",
                    request.jsonrpc
                )),
            ));
        }

        let Some(id) = request.id.clone() else {
            debug!("Notification: {}", request.method);
            return None;
        };

        debug!("Request {}: {}", id, request.method);
        let response = match self.dispatch(&request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                debug!("Request failed: {}", e);
                JsonRpcResponse::error(id, e.into())
            }
        };
        Some(response)
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, ServerError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": { "name": self.info.name, "version": self.info.version },
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.definitions() })),
            "tools/call" => {
                #[derive(Deserialize)]
                struct CallParams {
                    name: String,
                    #[serde(default)]
                    arguments: Value,
                }

                let params = params
                    .ok_or_else(|| ServerError::InvalidParams("missing params".to_string()))?;
                let call: CallParams = serde_json::from_value(params)
                    .map_err(|e| ServerError::InvalidParams(e.to_string()))?;
                let result = self.tools.call(&call.name, call.arguments).await;
                Ok(serde_json::to_value(result)?)
            }
            other => Err(ServerError::MethodNotFound(other.to_string())),
        }
    }

    /// Parse one input line into a request, or the error response to send.
    fn parse_line(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
        let value: Value = serde_json::from_str(line).map_err(|e| {
            JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::parse_error(format!("Parse error: {}", e)),
            )
        })?;
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            )
        })
    }

    /// Serve until the reader reaches EOF and every in-flight request has
    /// been answered. Only transport I/O errors end the loop early.
    pub async fn run<R, W>(
        self: Arc<Self>,
        mut reader: R,
        mut writer: W,
    ) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        let (response_tx, mut response_rx) = mpsc::channel(RESPONSE_CHANNEL_CAPACITY);
        let mut response_tx = Some(response_tx);

        loop {
            tokio::select! {
                read = reader.read_until(b'\n', &mut buf), if response_tx.is_some() => {
                    if read? == 0 {
                        debug!("Input closed; draining in-flight requests");
                        response_tx = None;
                        continue;
                    }
                    let frame = std::mem::take(&mut buf);

                    let request = match Self::parse_frame(frame) {
                        Ok(Some(request)) => request,
                        Ok(None) => continue,
                        Err(response) => {
                            warn!("Rejected malformed request");
                            write_frame(&mut writer, &response).await?;
                            continue;
                        }
                    };

                    if let Some(tx) = &response_tx {
                        let server = Arc::clone(&self);
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            if let Some(response) = server.handle(request).await {
                                let _ = tx.send(response).await;
                            }
                        });
                    }
                }

                response = response_rx.recv() => {
                    match response {
                        Some(response) => write_frame(&mut writer, &response).await?,
                        None => break,
                    }
                }
            }
        }

        Ok(())
    }

    /// Decode one raw input line. Blank lines yield `None`.
    fn parse_frame(frame: Vec<u8>) -> Result<Option<JsonRpcRequest>, JsonRpcResponse> {
        let line = String::from_utf8(frame).map_err(|e| {
            JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::parse_error(format!("Parse error: {}", e)),
            )
        })?;
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        Self::parse_line(line).map(Some)
    }
}

async fn write_frame<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = serde_json::to_vec(response)?;
    frame.push(b'\n');
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Serve on stdin/stdout.
pub async fn serve_stdio(server: Arc<McpServer>) -> Result<(), ServerError> {
    info!(
        "{} v{} listening on stdio (tools: {})",
        server.info.name,
        server.info.version,
        server.tools.names().join(", ")
    );
    let reader = BufReader::new(tokio::io::stdin());
    server.run(reader, tokio::io::stdout()).await?;
    info!("stdin closed, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::offline_service;
    use std::collections::HashMap;
    use tokio::io::{duplex, AsyncWriteExt};

    fn server() -> (tempfile::TempDir, Arc<McpServer>) {
        let (dir, service) = offline_service();
        let tools = ToolRegistry::with_memory_tools(Arc::new(service));
        (
            dir,
            Arc::new(McpServer::new(tools, ServerInfo::new("test-memory"))),
        )
    }

    /// Feed `input` to the server and collect every response.
    async fn exchange(server: Arc<McpServer>, input: &str) -> Vec<Value> {
        exchange_bytes(server, input.as_bytes()).await
    }

    async fn exchange_bytes(server: Arc<McpServer>, input: &[u8]) -> Vec<Value> {
        let (mut client_in, server_in) = duplex(64 * 1024);
        let (server_out, client_out) = duplex(64 * 1024);

        let task = tokio::spawn(server.run(BufReader::new(server_in), server_out));
        client_in.write_all(input).await.unwrap();
        drop(client_in);
        task.await.unwrap().unwrap();

        let mut lines = BufReader::new(client_out).lines();
        let mut responses = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            responses.push(serde_json::from_str(&line).unwrap());
        }
        responses
    }

    fn by_id(responses: &[Value]) -> HashMap<String, Value> {
        responses
            .iter()
            .map(|r| (r["id"].to_string(), r.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_handshake_and_list() {
        let (_dir, server) = server();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"t","version":"0"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#,
            "\n",
        );
        let responses = exchange(server, input).await;
        assert_eq!(responses.len(), 3);
        let responses = by_id(&responses);

        let init = &responses["1"]["result"];
        assert_eq!(init["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(init["serverInfo"]["name"], "test-memory");
        assert!(init["capabilities"]["tools"].is_object());

        let tools = responses["2"]["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["remember_this", "show_my_memories", "recall_memory"]);

        assert_eq!(responses["3"]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let (_dir, server) = server();
        let input = concat!(
            "{not json\n",
            r#"{"jsonrpc":"2.0","id":"a","method":"resources/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":"b","method":"tools/call"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":"c","method":"tools/call","params":{"arguments":{}}}"#,
            "\n",
            r#"{"jsonrpc":"1.0","id":"d","method":"ping"}"#,
            "\n",
        );
        let responses = exchange(server, input).await;
        assert_eq!(responses.len(), 5);
        let responses = by_id(&responses);

        assert_eq!(responses["null"]["error"]["code"], -32700);
        assert_eq!(responses["\"a\""]["error"]["code"], -32601);
        assert_eq!(responses["\"b\""]["error"]["code"], -32602);
        assert_eq!(responses["\"c\""]["error"]["code"], -32602);
        assert_eq!(responses["\"d\""]["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_tool_calls_over_the_wire() {
        let (_dir, server) = server();
        let remember = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"remember_this","arguments":{"memory":"Water the plants on Sunday"}}}"#;
        let responses = exchange(Arc::clone(&server), &format!("{remember}\n")).await;
        let result = &responses[0]["result"];
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["type"], "text");
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Memory stored successfully"));

        let recall = r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"recall_memory","arguments":{"query":"Water the plants on Sunday"}}}"#;
        let unknown = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#;
        let responses = exchange(server, &format!("{recall}\n{unknown}\n")).await;
        let responses = by_id(&responses);

        let text = responses["2"]["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Water the plants on Sunday"));
        assert_eq!(responses["3"]["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_keeps_serving() {
        let (_dir, server) = server();
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.push(b'\n');

        let responses = exchange_bytes(server, &input).await;
        assert_eq!(responses.len(), 2);
        let responses = by_id(&responses);
        assert_eq!(responses["null"]["error"]["code"], -32700);
        assert_eq!(responses["1"]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let (_dir, server) = server();
        let responses = exchange(server, r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 7);
    }

    #[tokio::test]
    async fn test_blank_lines_and_empty_input() {
        let (_dir, server) = server();
        assert!(exchange(server, "\n\n   \n").await.is_empty());
    }
}

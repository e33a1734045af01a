//! MCP tool server for pinemem.
//!
//! This crate provides:
//! - [`MemoryService`]: store, list and recall over the memory backends
//! - Three MCP tools (`remember_this`, `show_my_memories`, `recall_memory`)
//! - JSON-RPC 2.0 over newline-delimited stdio

pub mod error;
pub mod mcp;
pub mod render;
pub mod rpc;
pub mod service;
pub mod tools;

pub use error::ServerError;
pub use mcp::{serve_stdio, McpServer, ServerInfo, PROTOCOL_VERSION};
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use service::{MemoryService, ServiceError};
pub use tools::{CallToolResult, ToolHandler, ToolRegistry};

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

//! MCP tools and their registry.

use crate::render;
use crate::service::{MemoryService, ServiceError};
use async_trait::async_trait;
use pinemem_memory::Category;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tool description returned by `tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// Result of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Successful text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Failed result carrying an explanation.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// Concatenated text content.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Trait for tool handlers.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Tool name as exposed to clients.
    fn name(&self) -> &'static str;

    /// Description and input schema.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool. Failures are reported inside the result.
    async fn call(&self, arguments: Value) -> CallToolResult;
}

/// Registry of tools, listed in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three memory tools.
    pub fn with_memory_tools(service: Arc<MemoryService>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RememberTool::new(Arc::clone(&service))));
        registry.register(Arc::new(ShowMemoriesTool::new(Arc::clone(&service))));
        registry.register(Arc::new(RecallTool::new(service)));
        registry
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolHandler>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    /// Definitions of all tools.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Names of all tools.
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Call a tool by name.
    pub async fn call(&self, name: &str, arguments: Value) -> CallToolResult {
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => {
                debug!("Calling tool: {}", name);
                tool.call(arguments).await
            }
            None => {
                warn!("Unknown tool requested: {}", name);
                CallToolResult::error(format!("Unknown tool: {}", name))
            }
        }
    }
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ServiceError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| ServiceError::InvalidArgument(format!("invalid arguments: {}", e)))
}

/// Validate an optional positive count, falling back to `default`.
fn positive(value: Option<i64>, name: &str, default: usize) -> Result<usize, ServiceError> {
    match value {
        None => Ok(default),
        Some(v) if v >= 1 => Ok(v as usize),
        Some(v) => Err(ServiceError::InvalidArgument(format!(
            "'{}' must be at least 1 (got {})",
            name, v
        ))),
    }
}

fn finish(result: Result<String, ServiceError>, failure: &str) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::text(text),
        Err(e) => {
            warn!("{}: {}", failure, e);
            CallToolResult::error(format!("❌ {}: {}", failure, e))
        }
    }
}

/// `remember_this`: store a new memory.
pub struct RememberTool {
    service: Arc<MemoryService>,
}

impl RememberTool {
    pub fn new(service: Arc<MemoryService>) -> Self {
        Self { service }
    }

    async fn run(&self, arguments: Value) -> Result<String, ServiceError> {
        #[derive(Deserialize)]
        struct Args {
            memory: String,
            #[serde(default)]
            context: Option<String>,
        }

        let args: Args = parse_args(arguments)?;
        let stored = self
            .service
            .remember(&args.memory, args.context.as_deref())
            .await?;
        Ok(render::stored(&stored))
    }
}

#[async_trait]
impl ToolHandler for RememberTool {
    fn name(&self) -> &'static str {
        "remember_this"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Store a new memory in the vector database with automatic \
                          categorization and keyword extraction"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "memory": {
                        "type": "string",
                        "description": "The memory or information to store"
                    },
                    "context": {
                        "type": "string",
                        "description": "Optional additional context about this memory"
                    }
                },
                "required": ["memory"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> CallToolResult {
        finish(self.run(arguments).await, "Error storing memory")
    }
}

/// `show_my_memories`: list stored memories.
pub struct ShowMemoriesTool {
    service: Arc<MemoryService>,
}

impl ShowMemoriesTool {
    pub fn new(service: Arc<MemoryService>) -> Self {
        Self { service }
    }

    async fn run(&self, arguments: Value) -> Result<String, ServiceError> {
        #[derive(Deserialize)]
        struct Args {
            #[serde(default)]
            category: Option<String>,
            #[serde(default)]
            limit: Option<i64>,
        }

        let args: Args = parse_args(arguments)?;
        let category = match args.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<Category>()
                    .map_err(|e| ServiceError::InvalidArgument(e.to_string()))?,
            ),
        };
        let limit = positive(args.limit, "limit", self.service.default_list_limit())?;

        let listing = self.service.list(category, limit).await?;
        Ok(render::listing(&listing))
    }
}

#[async_trait]
impl ToolHandler for ShowMemoriesTool {
    fn name(&self) -> &'static str {
        "show_my_memories"
    }

    fn definition(&self) -> ToolDefinition {
        let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        ToolDefinition {
            name: self.name().to_string(),
            description: "Display stored memories with their metadata and categories"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "description": "Optional category filter",
                        "enum": categories
                    },
                    "limit": {
                        "type": "integer",
                        "description": format!(
                            "Maximum number of memories to show (default: {})",
                            self.service.default_list_limit()
                        ),
                        "minimum": 1
                    }
                }
            }),
        }
    }

    async fn call(&self, arguments: Value) -> CallToolResult {
        finish(self.run(arguments).await, "Error showing memories")
    }
}

/// `recall_memory`: semantic search over stored memories.
pub struct RecallTool {
    service: Arc<MemoryService>,
}

impl RecallTool {
    pub fn new(service: Arc<MemoryService>) -> Self {
        Self { service }
    }

    async fn run(&self, arguments: Value) -> Result<String, ServiceError> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            #[serde(default)]
            top_k: Option<i64>,
        }

        let args: Args = parse_args(arguments)?;
        let top_k = positive(args.top_k, "top_k", self.service.default_top_k())?;
        let result = self.service.recall(&args.query, top_k).await?;
        Ok(render::recall(&result))
    }
}

#[async_trait]
impl ToolHandler for RecallTool {
    fn name(&self) -> &'static str {
        "recall_memory"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Find memories related to your query using semantic search"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What you're trying to remember or find"
                    },
                    "top_k": {
                        "type": "integer",
                        "description": format!(
                            "Number of relevant memories to return (default: {})",
                            self.service.default_top_k()
                        ),
                        "minimum": 1
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> CallToolResult {
        finish(self.run(arguments).await, "Error recalling memory")
    }
}

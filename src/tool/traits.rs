// ABOUTME: Defines the Tool trait - the capability contract agents invoke.
// ABOUTME: Also provides ToolDescriptor for reasoners and FnTool for closure-backed tools.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::ToolResult;

/// What a reasoner is told about a tool: its name and input contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A capability that an agent can invoke during its decide/act loop.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name of this tool.
    fn name(&self) -> &str;

    /// Returns a human-readable description for the reasoner.
    fn description(&self) -> &str;

    /// Returns the JSON Schema for the tool's input arguments.
    fn schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    ///
    /// Returning `Err` and returning `ToolResult::error` are both treated as
    /// recoverable failures by the execution loop.
    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, anyhow::Error>;

    /// Describe this tool for a reasoner.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.schema(),
        }
    }
}

type ToolFn =
    Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<ToolResult, anyhow::Error>> + Send + Sync>;

/// A tool backed by an async closure.
///
/// Useful for wiring external capabilities without a dedicated type:
///
/// ```
/// use taskcrew::tool::{FnTool, ToolResult};
///
/// let tool = FnTool::new("Echo", "Echo the query back", |params| async move {
///     Ok(ToolResult::text(params["query"].as_str().unwrap_or_default()))
/// });
/// ```
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    schema: serde_json::Value,
    call: ToolFn,
}

impl FnTool {
    /// Create a tool from a name, description and async handler.
    ///
    /// The input schema defaults to an object with a single string `query`.
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, call: F) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult, anyhow::Error>> + Send + 'static,
    {
        let call: ToolFn = Arc::new(
            move |params: serde_json::Value| -> BoxFuture<'static, Result<ToolResult, anyhow::Error>> {
                Box::pin(call(params))
            },
        );
        Self {
            name: name.into(),
            description: description.into(),
            schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" }
                },
                "required": ["query"]
            }),
            call,
        }
    }

    /// Override the input schema.
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = schema;
        self
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> serde_json::Value {
        self.schema.clone()
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, anyhow::Error> {
        (self.call)(params).await
    }
}

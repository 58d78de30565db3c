// ABOUTME: Defines the ToolResult type - the outcome of one tool invocation
// ABOUTME: as seen by the execution loop: opaque text plus an error flag.

use serde::{Deserialize, Serialize};

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The output content, treated as opaque text by the engine.
    pub content: String,

    /// Whether this result represents an error.
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful text result.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }

    /// Serialize a value as pretty JSON into a successful result.
    pub fn json(value: &impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self::text(serde_json::to_string_pretty(value)?))
    }
}

impl Default for ToolResult {
    fn default() -> Self {
        Self::text("")
    }
}

// ABOUTME: ScopedTools - a view of the ToolDirectory restricted to one agent's tools.
// ABOUTME: Distinguishes unauthorized, unknown, and declared-but-missing tools.

use std::sync::Arc;

use crate::error::ToolError;
use crate::tool::{Tool, ToolDescriptor, ToolDirectory};

use super::Agent;

/// A filtered view of a ToolDirectory that only exposes an agent's declared tools.
///
/// Uses the decorator pattern: the directory is shared, the scope is just the
/// agent's allowlist.
#[derive(Debug, Clone)]
pub struct ScopedTools {
    directory: Arc<ToolDirectory>,
    role: String,
    allowed: Vec<String>,
}

impl ScopedTools {
    /// Scope a directory to an agent's declared tools.
    pub fn for_agent(directory: Arc<ToolDirectory>, agent: &Agent) -> Self {
        Self {
            directory,
            role: agent.role.clone(),
            allowed: agent.tools.clone(),
        }
    }

    /// Check if a tool name is in the allowlist.
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.iter().any(|a| a == name)
    }

    /// Resolve a tool by name.
    ///
    /// An undeclared tool is `NotAuthorized` when it exists in the directory
    /// and `NotFound` otherwise. A declared tool missing from the directory is
    /// `Unavailable`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        if !self.is_allowed(name) {
            if self.directory.contains(name) {
                return Err(ToolError::NotAuthorized {
                    role: self.role.clone(),
                    tool: name.to_string(),
                });
            }
            return Err(ToolError::NotFound(name.to_string()));
        }
        self.directory
            .lookup(name)
            .map_err(|_| ToolError::Unavailable(name.to_string()))
    }

    /// Descriptors of the scoped tools, in the agent's declaration order.
    ///
    /// Declared names absent from the directory are left out.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.allowed
            .iter()
            .filter_map(|name| self.directory.lookup(name).ok())
            .map(|tool| tool.descriptor())
            .collect()
    }

    /// Role this scope belongs to.
    pub fn role(&self) -> &str {
        &self.role
    }
}

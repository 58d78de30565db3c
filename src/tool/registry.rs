// ABOUTME: Implements the ToolDirectory - the name-to-capability mapping
// ABOUTME: populated before a run and shared read-only across task executions.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Tool, ToolDescriptor};
use crate::error::{RegistryError, ToolError};

/// Directory of callable tools, keyed by name.
///
/// Built with `&mut self` before any task executes, then shared behind an
/// `Arc` for lock-free concurrent reads.
#[derive(Default, Clone)]
pub struct ToolDirectory {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a tool from an Arc.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        tracing::debug!(tool = %name, "registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names, sorted alphabetically.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Describe every registered tool, sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.list()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.descriptor())
            .collect()
    }
}

impl std::fmt::Debug for ToolDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDirectory")
            .field("tools", &self.list())
            .finish()
    }
}

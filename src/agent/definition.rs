// ABOUTME: Agent definition types - the immutable persona/budget/capability record.
// ABOUTME: AgentRegistry holds the catalog of agents, keyed by unique role.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BuildError, RegistryError};
use crate::tool::ToolDirectory;

/// Iteration budget used when none is given.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Index of an agent inside its registry, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub(crate) usize);

impl AgentId {
    /// Registration position of this agent.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Definition of an agent that tasks can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    /// Unique role; used both as display name and as the selection key.
    pub role: String,

    /// Goal template. May reference run parameters such as `{topic}`.
    pub goal: String,

    /// Persona context passed to the reasoner.
    pub backstory: String,

    /// Tool names this agent may invoke, in declaration order, without duplicates.
    pub tools: Vec<String>,

    /// Upper bound on decide/act iterations for one task.
    pub max_iterations: usize,

    /// Whether this agent may hand a task off to another agent.
    pub allow_delegation: bool,
}

impl Agent {
    /// Create a new agent with required fields.
    pub fn new(role: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: String::new(),
            tools: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            allow_delegation: false,
        }
    }

    /// Set the backstory.
    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    /// Set the tools this agent may use. Duplicate names are collapsed.
    pub fn tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools.clear();
        for tool in tools {
            let tool = tool.into();
            if !self.tools.contains(&tool) {
                self.tools.push(tool);
            }
        }
        self
    }

    /// Set maximum iterations.
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Allow or forbid delegation.
    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    /// Whether this agent declared the given tool.
    pub fn can_use(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }
}

/// Registry of agent definitions.
///
/// Populated once before a run, then shared read-only (usually behind an `Arc`).
/// Registration order is preserved and is what `AgentId` indexes.
#[derive(Debug, Default, Clone)]
pub struct AgentRegistry {
    agents: Vec<Arc<Agent>>,
    by_role: HashMap<String, AgentId>,
}

impl AgentRegistry {
    /// Create a new empty agent registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent definition.
    pub fn register(&mut self, agent: Agent) -> Result<AgentId, RegistryError> {
        if agent.role.trim().is_empty() {
            return Err(RegistryError::InvalidAgent {
                role: agent.role,
                reason: "role must not be empty".into(),
            });
        }
        if agent.max_iterations == 0 {
            return Err(RegistryError::InvalidAgent {
                role: agent.role,
                reason: "max_iterations must be positive".into(),
            });
        }
        if self.by_role.contains_key(&agent.role) {
            return Err(RegistryError::DuplicateRole(agent.role));
        }

        let id = AgentId(self.agents.len());
        self.by_role.insert(agent.role.clone(), id);
        self.agents.push(Arc::new(agent));
        Ok(id)
    }

    /// Look up an agent by role.
    pub fn lookup(&self, role: &str) -> Result<Arc<Agent>, RegistryError> {
        self.id_of(role).map(|id| Arc::clone(&self.agents[id.0]))
    }

    /// Resolve a role to its id.
    pub fn id_of(&self, role: &str) -> Result<AgentId, RegistryError> {
        self.by_role
            .get(role)
            .copied()
            .ok_or_else(|| RegistryError::AgentNotFound(role.to_string()))
    }

    /// Get an agent by id.
    pub fn get(&self, id: AgentId) -> Option<&Arc<Agent>> {
        self.agents.get(id.0)
    }

    /// List all roles in registration order.
    pub fn roles(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.role.clone()).collect()
    }

    /// Iterate agents in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Arc<Agent>)> {
        self.agents.iter().enumerate().map(|(i, a)| (AgentId(i), a))
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Check that every tool an agent declares exists in the directory.
    pub fn validate_tools(&self, tools: &ToolDirectory) -> Result<(), BuildError> {
        for agent in &self.agents {
            if let Some(missing) = agent.tools.iter().find(|t| !tools.contains(t)) {
                return Err(BuildError::UnknownTool {
                    role: agent.role.clone(),
                    tool: missing.clone(),
                });
            }
        }
        Ok(())
    }
}

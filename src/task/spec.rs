// ABOUTME: Task declarations as supplied by callers, before graph validation.
// ABOUTME: Dependencies may be named by declaration index or by explicit id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a task in its declaration list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub usize);

impl TaskId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to another task in the same declaration list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskRef {
    /// 0-based declaration index.
    Index(usize),
    /// Explicit task id.
    Id(String),
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskRef::Index(i) => write!(f, "#{}", i),
            TaskRef::Id(id) => f.write_str(id),
        }
    }
}

impl From<usize> for TaskRef {
    fn from(index: usize) -> Self {
        TaskRef::Index(index)
    }
}

impl From<&str> for TaskRef {
    fn from(id: &str) -> Self {
        TaskRef::Id(id.to_string())
    }
}

impl From<String> for TaskRef {
    fn from(id: String) -> Self {
        TaskRef::Id(id)
    }
}

/// A task declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// Optional explicit id, unique within the declaration list.
    pub id: Option<String>,

    /// Description template.
    pub description: String,

    /// Guidance for the agent about the shape of the answer. Never validated.
    pub expected_output: String,

    /// Role of the agent this task is assigned to.
    pub agent: String,

    /// Upstream tasks whose outputs become this task's context.
    pub depends_on: Vec<TaskRef>,
}

impl TaskSpec {
    /// Create a new task assigned to an agent role.
    pub fn new(description: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            id: None,
            description: description.into(),
            expected_output: String::new(),
            agent: agent.into(),
            depends_on: Vec::new(),
        }
    }

    /// Set an explicit id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the expected output guidance.
    pub fn expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = expected.into();
        self
    }

    /// Add a dependency.
    pub fn depends_on(mut self, dependency: impl Into<TaskRef>) -> Self {
        self.depends_on.push(dependency.into());
        self
    }
}

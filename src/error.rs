// ABOUTME: Defines all error types for the taskcrew library using thiserror.
// ABOUTME: Each concern has its own error enum, unified under CrewError.

use std::path::PathBuf;

/// Top-level error type for the taskcrew library.
#[derive(Debug, thiserror::Error)]
pub enum CrewError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Run error: {0}")]
    Run(#[from] RunError),
}

/// Errors from registering or looking up agents and tools.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Agent role '{0}' is already registered")]
    DuplicateRole(String),

    #[error("Invalid agent '{role}': {reason}")]
    InvalidAgent { role: String, reason: String },

    #[error("Agent role not found: {0}")]
    AgentNotFound(String),

    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),
}

/// Errors detected while building a task graph or crew.
///
/// A build error rejects the whole run; no task has started when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Task '{task}' is assigned to unknown agent role '{role}'")]
    UnknownAgent { task: String, role: String },

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Task id '{0}' is declared more than once")]
    DuplicateTaskId(String),

    #[error("Dependency cycle detected: {}", .tasks.join(" -> "))]
    Cycle { tasks: Vec<String> },

    #[error("Agent '{role}' declares unregistered tool '{tool}'")]
    UnknownTool { role: String, tool: String },

    #[error("No reasoner configured")]
    MissingReasoner,
}

/// Errors from tool resolution and execution.
///
/// Everything except `Unavailable` is recoverable inside the execution loop:
/// it is recorded in the transcript and shown to the reasoner.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Agent '{role}' is not authorized to use tool '{tool}'")]
    NotAuthorized { role: String, tool: String },

    #[error("Tool '{0}' is declared but missing from the tool directory")]
    Unavailable(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Execution failed: {0}")]
    Execution(#[source] anyhow::Error),
}

/// Errors from reasoner backends.
#[derive(Debug, thiserror::Error)]
pub enum ReasonerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed decision: {0}")]
    Protocol(String),
}

/// Errors from loading crew configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Why a task ended in the `Failed` state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    #[error("reasoner failed: {0}")]
    Reasoner(String),

    #[error("tool '{0}' is unavailable")]
    ToolUnavailable(String),

    #[error("cancelled")]
    Cancelled,

    #[error("iteration deadline exceeded")]
    DeadlineExceeded,

    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Run-level errors.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Template in {location} references missing parameter '{name}'")]
    MissingParameter { location: String, name: String },

    #[error("No task produced an output ({} failed or skipped)", .failures.len())]
    NoOutput { failures: Vec<(String, String)> },

    #[error("Run incomplete: failed [{}], skipped [{}]", .failed.join(", "), .skipped.join(", "))]
    Incomplete {
        failed: Vec<String>,
        skipped: Vec<String>,
    },
}

// ABOUTME: Task statuses and the CrewReport produced at the end of a run.
// ABOUTME: Surfaces every task's terminal status; failures and skips are never dropped.

use std::fmt;

use serde::Serialize;

use crate::agent::Transcript;
use crate::error::{RunError, TaskFailure};

/// Why a task was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Its agent was not in the run's role selection.
    NotSelected,
    /// A task it depends on (directly or transitively) failed.
    UpstreamFailed { task: String },
    /// The run was cancelled or hit its deadline before it started.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotSelected => write!(f, "agent not selected for this run"),
            SkipReason::UpstreamFailed { task } => write!(f, "upstream task '{}' failed", task),
            SkipReason::Cancelled => write!(f, "run cancelled before the task started"),
        }
    }
}

/// Lifecycle status of a task within one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    /// Budget exhausted; output is the partial transcript.
    DegradedComplete,
    Failed(#[serde(serialize_with = "serialize_display")] TaskFailure),
    Skipped(SkipReason),
}

fn serialize_display<S: serde::Serializer>(value: &TaskFailure, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

impl TaskStatus {
    /// Whether this status is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }

    /// Whether a task in this status produced an output.
    pub fn has_output(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::DegradedComplete)
    }

    /// Whether this status error-flags the run.
    pub fn is_error(&self) -> bool {
        matches!(self, TaskStatus::Failed(_) | TaskStatus::Skipped(_))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Succeeded => write!(f, "succeeded"),
            TaskStatus::DegradedComplete => write!(f, "degraded"),
            TaskStatus::Failed(failure) => write!(f, "failed: {}", failure),
            TaskStatus::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// Terminal record of one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub key: String,
    pub description: String,
    /// Role the task was assigned to.
    pub role: String,
    pub status: TaskStatus,
    /// Present for `Succeeded` and `DegradedComplete`.
    pub output: Option<String>,
    pub iterations: usize,
    pub transcript: Transcript,
}

impl TaskOutcome {
    /// The failure or skip reason, if any.
    pub fn reason(&self) -> Option<String> {
        match &self.status {
            TaskStatus::Failed(failure) => Some(failure.to_string()),
            TaskStatus::Skipped(reason) => Some(reason.to_string()),
            _ => None,
        }
    }
}

/// Aggregated result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct CrewReport {
    pub run_id: String,
    /// One outcome per task, in dependency order.
    pub outcomes: Vec<TaskOutcome>,
    /// Task keys in the order they reached a terminal state.
    pub completion_order: Vec<String>,
    /// Concatenated outputs of succeeded and degraded tasks.
    pub output: String,
}

impl CrewReport {
    /// Assemble a report from outcomes already in dependency order.
    pub fn new(run_id: impl Into<String>, outcomes: Vec<TaskOutcome>, completion_order: Vec<String>) -> Self {
        let output = outcomes
            .iter()
            .filter_map(|o| match (&o.status, &o.output) {
                (TaskStatus::Succeeded, Some(text)) => Some(text.clone()),
                (TaskStatus::DegradedComplete, Some(text)) => Some(format!(
                    "[DEGRADED: {} ran out of iterations; partial transcript follows]\n{}",
                    o.key, text
                )),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        Self {
            run_id: run_id.into(),
            outcomes,
            completion_order,
            output,
        }
    }

    /// Find an outcome by task key.
    pub fn outcome(&self, key: &str) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.key == key)
    }

    /// Whether any task failed or was skipped.
    pub fn is_error(&self) -> bool {
        self.outcomes.iter().any(|o| o.status.is_error())
    }

    /// Whether at least one task produced an output.
    pub fn has_output(&self) -> bool {
        self.outcomes.iter().any(|o| o.status.has_output())
    }

    /// Keys of failed tasks.
    pub fn failed(&self) -> Vec<String> {
        self.keys_where(|s| matches!(s, TaskStatus::Failed(_)))
    }

    /// Keys of skipped tasks.
    pub fn skipped(&self) -> Vec<String> {
        self.keys_where(|s| matches!(s, TaskStatus::Skipped(_)))
    }

    fn keys_where(&self, pred: impl Fn(&TaskStatus) -> bool) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| pred(&o.status))
            .map(|o| o.key.clone())
            .collect()
    }

    /// Human-readable list of failed and skipped tasks, or `None` when clean.
    pub fn error_summary(&self) -> Option<String> {
        let lines: Vec<String> = self
            .outcomes
            .iter()
            .filter(|o| o.status.is_error())
            .map(|o| format!("- {} ({}): {}", o.key, o.role, o.status))
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(format!("{} task(s) did not complete:\n{}", lines.len(), lines.join("\n")))
        }
    }

    /// Turn an error-flagged report into `RunError::Incomplete`.
    pub fn into_result(self) -> Result<Self, RunError> {
        if self.is_error() {
            return Err(RunError::Incomplete {
                failed: self.failed(),
                skipped: self.skipped(),
            });
        }
        Ok(self)
    }
}

impl fmt::Display for CrewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        for outcome in &self.outcomes {
            writeln!(
                f,
                "  {} [{}] {} ({} iterations)",
                outcome.key, outcome.role, outcome.status, outcome.iterations
            )?;
        }
        Ok(())
    }
}

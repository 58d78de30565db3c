// ABOUTME: Transcript of one task's decide/act loop.
// ABOUTME: Entries are tagged with iteration and acting role; rendered for degraded outputs.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// What happened during one loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// A tool was invoked (or an invocation was refused) and observed.
    ToolCall {
        tool: String,
        arguments: serde_json::Value,
        output: String,
        is_error: bool,
    },
    /// The task was handed to another agent.
    Delegation { to: String, instructions: String },
    /// A decision was refused and the loop continued.
    Rejected { reason: String },
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Global iteration number within the task, starting at 1.
    pub iteration: usize,
    /// Role of the agent that acted.
    pub role: String,
    pub step: Step,
}

/// Ordered record of everything an execution loop did for a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, iteration: usize, role: impl Into<String>, step: Step) {
        self.entries.push(TranscriptEntry {
            iteration,
            role: role.into(),
            step,
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the transcript as plain text.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "(no steps recorded)".to_string();
        }

        let mut out = String::new();
        for entry in &self.entries {
            let _ = write!(out, "[{}] {}: ", entry.iteration, entry.role);
            match &entry.step {
                Step::ToolCall {
                    tool,
                    arguments,
                    output,
                    is_error,
                } => {
                    let label = if *is_error { "error" } else { "observation" };
                    let _ = writeln!(out, "called {} with {}", tool, arguments);
                    let _ = writeln!(out, "  {}: {}", label, output);
                }
                Step::Delegation { to, instructions } => {
                    let _ = writeln!(out, "delegated to {}: {}", to, instructions);
                }
                Step::Rejected { reason } => {
                    let _ = writeln!(out, "rejected: {}", reason);
                }
            }
        }
        out.trim_end().to_string()
    }
}

// ABOUTME: Prompt and Decision types exchanged between the execution loop and reasoners.
// ABOUTME: A reasoner answers each prompt with exactly one Decision.

use serde::{Deserialize, Serialize};

/// Everything a reasoner needs to decide the next step of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// Role of the acting agent.
    pub role: String,
    /// Agent goal with run parameters substituted.
    pub goal: String,
    pub backstory: String,
    /// Key of the task being worked on.
    pub task_key: String,
    /// Task description with run parameters substituted.
    pub description: String,
    pub expected_output: String,
    /// Outputs of upstream tasks, already formatted.
    pub context: String,
    /// Roles this agent may delegate to. Empty when delegation is not allowed.
    pub coworkers: Vec<String>,
    /// Current iteration within the task, starting at 1.
    pub iteration: usize,
    /// Last iteration the acting agent may use.
    pub max_iterations: usize,
}

/// The single next step chosen by a reasoner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    /// Invoke a tool with structured arguments.
    ToolCall {
        tool: String,
        arguments: serde_json::Value,
    },
    /// Hand the task to another agent.
    Delegate { to: String, instructions: String },
    /// Finish the task.
    FinalAnswer { answer: String },
}

impl Decision {
    /// Create a tool call decision.
    pub fn tool_call(tool: impl Into<String>, arguments: serde_json::Value) -> Self {
        Decision::ToolCall {
            tool: tool.into(),
            arguments,
        }
    }

    /// Create a delegation decision.
    pub fn delegate(to: impl Into<String>, instructions: impl Into<String>) -> Self {
        Decision::Delegate {
            to: to.into(),
            instructions: instructions.into(),
        }
    }

    /// Create a final answer decision.
    pub fn final_answer(answer: impl Into<String>) -> Self {
        Decision::FinalAnswer {
            answer: answer.into(),
        }
    }
}

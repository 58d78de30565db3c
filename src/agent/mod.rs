// ABOUTME: Agent module - definitions, the agent registry, and the execution loop.
// ABOUTME: Provides Agent, AgentRegistry, ScopedTools, Transcript, and ExecutionLoop.

mod definition;
mod filter;
mod runner;
mod transcript;

pub use definition::{Agent, AgentId, AgentRegistry, DEFAULT_MAX_ITERATIONS};
pub use filter::ScopedTools;
pub use runner::{ExecutionLoop, LoopOutcome, TaskJob, TaskRun};
pub use transcript::{Step, Transcript, TranscriptEntry};

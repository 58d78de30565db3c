// ABOUTME: Defines the Reasoner trait - the abstraction that lets the execution
// ABOUTME: loop work with any decision backend (chat models, scripts, closures).

use async_trait::async_trait;

use super::{Decision, Prompt};
use crate::agent::Transcript;
use crate::error::ReasonerError;
use crate::tool::ToolDescriptor;

/// Decides the next step of a task.
///
/// Implementations are stateless with respect to a task: the full transcript
/// is passed on every call.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn decide(
        &self,
        prompt: &Prompt,
        tools: &[ToolDescriptor],
        transcript: &Transcript,
    ) -> Result<Decision, ReasonerError>;
}

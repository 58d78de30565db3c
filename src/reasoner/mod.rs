// ABOUTME: Reasoner module - the decision-making collaborator of the execution loop.
// ABOUTME: Provides the Reasoner trait, Prompt/Decision types, ChatReasoner and FnReasoner.

pub mod chat;
mod scripted;
mod traits;
mod types;

pub use chat::{ChatReasoner, ReasonerConfig};
pub use scripted::FnReasoner;
pub use traits::Reasoner;
pub use types::{Decision, Prompt};

// ABOUTME: FnReasoner - a closure-backed reasoner for tests and dry runs.
// ABOUTME: No network; decisions come straight from caller code.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::{Decision, Prompt, Reasoner};
use crate::agent::Transcript;
use crate::error::ReasonerError;
use crate::tool::ToolDescriptor;

type DecideFn = Arc<
    dyn Fn(Prompt, Vec<ToolDescriptor>, Transcript) -> BoxFuture<'static, Result<Decision, ReasonerError>>
        + Send
        + Sync,
>;

/// A reasoner backed by an async closure.
///
/// The closure gets owned copies of the prompt, tool descriptors and
/// transcript, so it can hold them across `.await` points.
#[derive(Clone)]
pub struct FnReasoner {
    decide: DecideFn,
}

impl FnReasoner {
    /// Create a reasoner from an async closure.
    pub fn new<F, Fut>(decide: F) -> Self
    where
        F: Fn(Prompt, Vec<ToolDescriptor>, Transcript) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Decision, ReasonerError>> + Send + 'static,
    {
        let decide: DecideFn = Arc::new(
            move |prompt: Prompt,
                  tools: Vec<ToolDescriptor>,
                  transcript: Transcript|
                  -> BoxFuture<'static, Result<Decision, ReasonerError>> {
                Box::pin(decide(prompt, tools, transcript))
            },
        );
        Self { decide }
    }

    /// A reasoner that immediately answers every task with `{role}: {description}`.
    pub fn echo() -> Self {
        Self::new(|prompt, _, _| async move {
            Ok(Decision::final_answer(format!(
                "{}: {}",
                prompt.role, prompt.description
            )))
        })
    }
}

impl fmt::Debug for FnReasoner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnReasoner").finish_non_exhaustive()
    }
}

#[async_trait]
impl Reasoner for FnReasoner {
    async fn decide(
        &self,
        prompt: &Prompt,
        tools: &[ToolDescriptor],
        transcript: &Transcript,
    ) -> Result<Decision, ReasonerError> {
        (self.decide)(prompt.clone(), tools.to_vec(), transcript.clone()).await
    }
}

// ABOUTME: ExecutionLoop - runs the bounded decide/act cycle for one task.
// ABOUTME: Handles tool calls, delegation with a shared budget, cancellation and deadlines.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{Agent, AgentId, AgentRegistry, ScopedTools, Step, Transcript};
use crate::error::{TaskFailure, ToolError};
use crate::reasoner::{Decision, Prompt, Reasoner};
use crate::task::TaskId;
use crate::tool::ToolDirectory;

/// One unit of work handed to an execution loop.
#[derive(Debug, Clone)]
pub struct TaskJob {
    pub task: TaskId,
    pub key: String,
    pub agent: AgentId,
    /// Description with run parameters substituted.
    pub description: String,
    pub expected_output: String,
    /// Formatted dependency outputs.
    pub context: String,
}

/// How an execution loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// The reasoner gave a final answer.
    Succeeded(String),
    /// The budget ran out; carries the rendered transcript.
    Degraded(String),
    Failed(TaskFailure),
}

/// Result from running an execution loop.
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub outcome: LoopOutcome,

    /// Number of iterations consumed, across delegations.
    pub iterations: usize,

    /// Role of the agent that acted last.
    pub final_role: String,

    pub transcript: Transcript,
}

enum Next {
    Continue,
    Finish(String),
    Switch(AgentId),
}

struct Acting {
    id: AgentId,
    agent: Arc<Agent>,
    scope: ScopedTools,
}

/// Drives agents through the decide/act cycle.
///
/// Cheap to clone; every worker gets its own copy.
#[derive(Clone)]
pub struct ExecutionLoop {
    agents: Arc<AgentRegistry>,
    tools: Arc<ToolDirectory>,
    reasoner: Arc<dyn Reasoner>,
    /// Agent goals with run parameters substituted, indexed by `AgentId`.
    goals: Arc<[String]>,
    cancel: CancellationToken,
    iteration_timeout: Option<Duration>,
}

impl ExecutionLoop {
    /// Create a new execution loop.
    ///
    /// Goals default to the raw agent goals; use [`ExecutionLoop::goals`] to
    /// supply interpolated ones.
    pub fn new(
        agents: Arc<AgentRegistry>,
        tools: Arc<ToolDirectory>,
        reasoner: Arc<dyn Reasoner>,
    ) -> Self {
        let goals: Arc<[String]> = agents.iter().map(|(_, a)| a.goal.clone()).collect();
        Self {
            agents,
            tools,
            reasoner,
            goals,
            cancel: CancellationToken::new(),
            iteration_timeout: None,
        }
    }

    /// Set the per-agent goals, indexed by `AgentId`.
    pub fn goals(mut self, goals: Vec<String>) -> Self {
        self.goals = goals.into();
        self
    }

    /// Set the cancellation token observed at every iteration boundary.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Bound every iteration by a deadline.
    pub fn iteration_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.iteration_timeout = timeout;
        self
    }

    fn acting(&self, id: AgentId) -> Option<Acting> {
        let agent = Arc::clone(self.agents.get(id)?);
        let scope = ScopedTools::for_agent(Arc::clone(&self.tools), &agent);
        Some(Acting { id, agent, scope })
    }

    /// Run the loop for one task.
    pub async fn run(&self, job: TaskJob) -> TaskRun {
        let mut transcript = Transcript::new();

        let Some(mut acting) = self.acting(job.agent) else {
            return TaskRun {
                outcome: LoopOutcome::Failed(TaskFailure::Reasoner(format!(
                    "agent {} is not registered",
                    job.agent.index()
                ))),
                iterations: 0,
                final_role: String::new(),
                transcript,
            };
        };

        let budget = acting.agent.max_iterations;
        let mut limit = budget;
        let mut iteration = 0;

        let outcome = loop {
            if iteration >= limit {
                tracing::warn!(
                    task = %job.key,
                    role = %acting.agent.role,
                    iterations = iteration,
                    "Iteration budget exhausted without a final answer"
                );
                break LoopOutcome::Degraded(transcript.render());
            }
            if self.cancel.is_cancelled() {
                break LoopOutcome::Failed(TaskFailure::Cancelled);
            }

            iteration += 1;
            tracing::debug!(task = %job.key, role = %acting.agent.role, iteration, limit, "Iteration");

            let step = self.iterate(&job, &acting, iteration, limit, &mut transcript);
            let next = match self.iteration_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, step).await {
                    Ok(next) => next,
                    Err(_) => Err(TaskFailure::DeadlineExceeded),
                },
                None => step.await,
            };

            match next {
                Ok(Next::Continue) => {}
                Ok(Next::Finish(answer)) => break LoopOutcome::Succeeded(answer),
                Ok(Next::Switch(target)) => match self.acting(target) {
                    Some(next_agent) => {
                        let remaining = budget - iteration;
                        limit = iteration + next_agent.agent.max_iterations.min(remaining);
                        tracing::info!(
                            task = %job.key,
                            from = %acting.agent.role,
                            to = %next_agent.agent.role,
                            remaining,
                            "Task delegated"
                        );
                        acting = next_agent;
                    }
                    None => break LoopOutcome::Failed(TaskFailure::Reasoner(format!(
                        "delegation target {} vanished",
                        target.index()
                    ))),
                },
                Err(failure) => break LoopOutcome::Failed(failure),
            }
        };

        TaskRun {
            outcome,
            iterations: iteration,
            final_role: acting.agent.role.clone(),
            transcript,
        }
    }

    fn prompt(&self, job: &TaskJob, acting: &Acting, iteration: usize, limit: usize) -> Prompt {
        let coworkers = if acting.agent.allow_delegation {
            self.agents
                .roles()
                .into_iter()
                .filter(|role| *role != acting.agent.role)
                .collect()
        } else {
            Vec::new()
        };

        Prompt {
            role: acting.agent.role.clone(),
            goal: self
                .goals
                .get(acting.id.index())
                .cloned()
                .unwrap_or_else(|| acting.agent.goal.clone()),
            backstory: acting.agent.backstory.clone(),
            task_key: job.key.clone(),
            description: job.description.clone(),
            expected_output: job.expected_output.clone(),
            context: job.context.clone(),
            coworkers,
            iteration,
            max_iterations: limit,
        }
    }

    async fn iterate(
        &self,
        job: &TaskJob,
        acting: &Acting,
        iteration: usize,
        limit: usize,
        transcript: &mut Transcript,
    ) -> Result<Next, TaskFailure> {
        let prompt = self.prompt(job, acting, iteration, limit);
        let descriptors = acting.scope.descriptors();

        // The reasoner call is abandoned on cancellation.
        let decision = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(TaskFailure::Cancelled),
            decision = self.reasoner.decide(&prompt, &descriptors, transcript) => {
                decision.map_err(|e| TaskFailure::Reasoner(e.to_string()))?
            }
        };

        let role = acting.agent.role.as_str();
        match decision {
            Decision::FinalAnswer { answer } => {
                tracing::debug!(task = %job.key, role, iteration, "Final answer");
                Ok(Next::Finish(answer))
            }
            Decision::ToolCall { tool, arguments } => {
                tracing::debug!(task = %job.key, role, iteration, tool = %tool, "Tool call");
                let (output, is_error) = match acting.scope.resolve(&tool) {
                    Ok(handle) => match handle.execute(arguments.clone()).await {
                        Ok(result) => (result.content, result.is_error),
                        Err(e) => (ToolError::Execution(e).to_string(), true),
                    },
                    Err(ToolError::Unavailable(name)) => {
                        return Err(TaskFailure::ToolUnavailable(name));
                    }
                    Err(e) => (e.to_string(), true),
                };
                transcript.push(
                    iteration,
                    role,
                    Step::ToolCall {
                        tool,
                        arguments,
                        output,
                        is_error,
                    },
                );
                Ok(Next::Continue)
            }
            Decision::Delegate { to, instructions } => match self.check_delegation(&acting.agent, &to) {
                Ok(target) => {
                    transcript.push(iteration, role, Step::Delegation { to, instructions });
                    Ok(Next::Switch(target))
                }
                Err(reason) => {
                    tracing::warn!(task = %job.key, role, to = %to, reason = %reason, "Delegation rejected");
                    transcript.push(iteration, role, Step::Rejected { reason });
                    Ok(Next::Continue)
                }
            },
        }
    }

    fn check_delegation(&self, from: &Agent, to: &str) -> Result<AgentId, String> {
        if !from.allow_delegation {
            return Err(format!("Agent '{}' is not allowed to delegate", from.role));
        }
        if from.role == to {
            return Err(format!("Agent '{}' cannot delegate to itself", from.role));
        }
        self.agents
            .id_of(to)
            .map_err(|_| format!("No coworker with role '{}'", to))
    }
}

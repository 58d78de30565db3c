// ABOUTME: Run driver - drains the scheduler's ready set into a bounded pool of workers.
// ABOUTME: Owns the RunContext, applies cancellation and deadlines, and assembles the report.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::context::{OutputQuality, RunContext, TaskOutput};
use super::report::{CrewReport, TaskOutcome, TaskStatus};
use super::scheduler::{Scheduler, Selection};
use crate::agent::{ExecutionLoop, LoopOutcome, TaskJob, TaskRun};
use crate::error::TaskFailure;
use crate::task::{Params, TaskGraph, TaskId};

/// Default number of tasks executed at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Engine settings for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Upper bound on concurrently running tasks. Values below 1 act as 1.
    pub max_concurrency: usize,
    /// Deadline for the whole run.
    pub run_timeout: Option<Duration>,
    /// Deadline for each decide/act iteration.
    pub iteration_timeout: Option<Duration>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            run_timeout: None,
            iteration_timeout: None,
        }
    }
}

impl RunSettings {
    /// Set the concurrency bound.
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Set the whole-run deadline.
    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Set the per-iteration deadline.
    pub fn iteration_timeout(mut self, timeout: Duration) -> Self {
        self.iteration_timeout = Some(timeout);
        self
    }
}

/// Task text with run parameters already substituted.
#[derive(Debug, Clone)]
pub(crate) struct PreparedTask {
    pub description: String,
    pub expected_output: String,
}

/// Everything the driver needs for one run.
pub(crate) struct RunPlan {
    pub run_id: String,
    pub graph: Arc<TaskGraph>,
    pub selection: Selection,
    pub params: Params,
    pub prepared: Vec<PreparedTask>,
    pub settings: RunSettings,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Execute a run to completion (or cancellation) and build its report.
///
/// `cancel` must be the token the execution loop observes.
pub(crate) async fn drive(plan: RunPlan, runner: ExecutionLoop, cancel: CancellationToken) -> CrewReport {
    let span = tracing::info_span!("crew_run", run_id = %plan.run_id);
    drive_inner(plan, runner, cancel).instrument(span).await
}

async fn drive_inner(plan: RunPlan, runner: ExecutionLoop, cancel: CancellationToken) -> CrewReport {
    let RunPlan {
        run_id,
        graph,
        selection,
        params,
        prepared,
        settings,
    } = plan;

    tracing::info!(
        tasks = graph.len(),
        max_concurrency = settings.max_concurrency,
        "Run started"
    );

    let max_concurrency = settings.max_concurrency.max(1);
    let mut scheduler = Scheduler::new(Arc::clone(&graph), selection);
    let mut context = RunContext::new(params);
    let mut runs: HashMap<TaskId, TaskRun> = HashMap::new();

    let mut workers: JoinSet<(TaskId, TaskRun)> = JoinSet::new();
    let mut spawned: HashMap<tokio::task::Id, TaskId> = HashMap::new();
    let mut cancel_applied = false;
    let mut deadline_fired = false;

    let deadline = async {
        match settings.run_timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        if cancel.is_cancelled() {
            if !cancel_applied {
                cancel_applied = true;
                let skipped = scheduler.cancel_pending();
                tracing::warn!(
                    skipped = skipped.len(),
                    running = workers.len(),
                    "Run cancelled; pending tasks skipped"
                );
            }
        } else {
            while workers.len() < max_concurrency {
                let Some(id) = scheduler.next_ready() else {
                    break;
                };
                let Some(node) = graph.node(id) else {
                    continue;
                };
                let job = TaskJob {
                    task: id,
                    key: node.key.clone(),
                    agent: node.agent,
                    description: prepared
                        .get(id.index())
                        .map(|p| p.description.clone())
                        .unwrap_or_else(|| node.description.clone()),
                    expected_output: prepared
                        .get(id.index())
                        .map(|p| p.expected_output.clone())
                        .unwrap_or_else(|| node.expected_output.clone()),
                    context: context.resolve_context(&graph, node),
                };

                let span = tracing::info_span!("task", task = %node.key, role = %node.role);
                let worker = runner.clone();
                let handle = workers.spawn(
                    async move {
                        tracing::info!("Task started");
                        let run = worker.run(job).await;
                        (id, run)
                    }
                    .instrument(span),
                );
                spawned.insert(handle.id(), id);
            }
        }

        if workers.is_empty() {
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled(), if !cancel_applied => {}
            _ = &mut deadline, if !deadline_fired => {
                deadline_fired = true;
                tracing::warn!("Run deadline exceeded; cancelling");
                cancel.cancel();
            }
            Some(joined) = workers.join_next_with_id() => {
                let (id, status) = match joined {
                    Ok((handle_id, (id, run))) => {
                        spawned.remove(&handle_id);
                        let status = settle_run(id, &run, &mut context, &cancel);
                        runs.insert(id, run);
                        (id, status)
                    }
                    Err(err) => {
                        let Some(id) = spawned.remove(&err.id()) else {
                            continue;
                        };
                        let failure = if err.is_panic() {
                            TaskFailure::Panicked(panic_message(err.into_panic()))
                        } else {
                            TaskFailure::Cancelled
                        };
                        (id, TaskStatus::Failed(failure))
                    }
                };

                let key = graph.node(id).map(|n| n.key.as_str()).unwrap_or_default();
                match &status {
                    TaskStatus::Succeeded => tracing::info!(task = key, "Task succeeded"),
                    other => tracing::warn!(task = key, status = %other, "Task finished without a clean answer"),
                }
                scheduler.complete(id, status);
            }
        }
    }

    let report = build_report(run_id, &graph, &scheduler, &context, runs);
    tracing::info!(
        succeeded = report.outcomes.iter().filter(|o| o.status == TaskStatus::Succeeded).count(),
        failed = report.failed().len(),
        skipped = report.skipped().len(),
        "Run finished"
    );
    report
}

/// Record a finished loop's output and map it to a task status.
///
/// The output is written before the scheduler hears about the completion, so
/// dependents always see it.
fn settle_run(id: TaskId, run: &TaskRun, context: &mut RunContext, cancel: &CancellationToken) -> TaskStatus {
    match &run.outcome {
        LoopOutcome::Succeeded(text) => {
            context.record(
                id,
                TaskOutput {
                    text: text.clone(),
                    quality: OutputQuality::Complete,
                },
            );
            TaskStatus::Succeeded
        }
        LoopOutcome::Degraded(text) => {
            context.record(
                id,
                TaskOutput {
                    text: text.clone(),
                    quality: OutputQuality::Degraded,
                },
            );
            TaskStatus::DegradedComplete
        }
        LoopOutcome::Failed(failure) => {
            if *failure == TaskFailure::DeadlineExceeded {
                cancel.cancel();
            }
            TaskStatus::Failed(failure.clone())
        }
    }
}

fn build_report(
    run_id: String,
    graph: &TaskGraph,
    scheduler: &Scheduler,
    context: &RunContext,
    mut runs: HashMap<TaskId, TaskRun>,
) -> CrewReport {
    let outcomes = graph
        .topological_order()
        .into_iter()
        .filter_map(|id| {
            let node = graph.node(id)?;
            let status = scheduler.status(id).cloned().unwrap_or(TaskStatus::Pending);
            let output = if status.has_output() {
                context.output(id).map(|o| o.text.clone())
            } else {
                None
            };
            let run = runs.remove(&id);
            Some(TaskOutcome {
                key: node.key.clone(),
                description: node.description.clone(),
                role: node.role.clone(),
                status,
                output,
                iterations: run.as_ref().map(|r| r.iterations).unwrap_or(0),
                transcript: run.map(|r| r.transcript).unwrap_or_default(),
            })
        })
        .collect();

    let completion_order = scheduler
        .completion_order()
        .iter()
        .filter_map(|id| graph.node(*id).map(|n| n.key.clone()))
        .collect();

    CrewReport::new(run_id, outcomes, completion_order)
}

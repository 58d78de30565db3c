// ABOUTME: Scheduler - the per-run state machine over a TaskGraph.
// ABOUTME: In-degree tracking, a declaration-ordered ready set, selection, failure and cancel propagation.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use super::report::{SkipReason, TaskStatus};
use crate::agent::{AgentId, AgentRegistry};
use crate::error::RegistryError;
use crate::task::{TaskGraph, TaskId};

/// Which agents' tasks a run executes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(HashSet<AgentId>),
}

impl Selection {
    /// Resolve role names against the registry. An empty list selects everything.
    pub fn from_roles<S: AsRef<str>>(agents: &AgentRegistry, roles: &[S]) -> Result<Self, RegistryError> {
        if roles.is_empty() {
            return Ok(Selection::All);
        }
        let ids = roles
            .iter()
            .map(|role| agents.id_of(role.as_ref()))
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Selection::Only(ids))
    }

    pub fn includes(&self, agent: AgentId) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(ids) => ids.contains(&agent),
        }
    }
}

/// Tracks which tasks may start and the status of every task in a run.
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<TaskGraph>,
    selection: Selection,
    /// Dependencies not yet terminal, per task.
    in_degree: Vec<usize>,
    status: Vec<TaskStatus>,
    ready: BTreeSet<TaskId>,
    completion_order: Vec<TaskId>,
}

impl Scheduler {
    /// Create a scheduler and seed the ready set.
    ///
    /// Non-selected tasks without dependencies are skipped immediately and
    /// release their dependents.
    pub fn new(graph: Arc<TaskGraph>, selection: Selection) -> Self {
        let in_degree = graph.nodes().iter().map(|n| n.dependencies.len()).collect();
        let status = vec![TaskStatus::Pending; graph.len()];
        let mut scheduler = Self {
            graph,
            selection,
            in_degree,
            status,
            ready: BTreeSet::new(),
            completion_order: Vec::new(),
        };

        let roots: Vec<TaskId> = scheduler
            .graph
            .nodes()
            .iter()
            .filter(|n| n.dependencies.is_empty())
            .map(|n| n.id)
            .collect();
        for id in roots {
            scheduler.settle(id);
        }
        scheduler
    }

    /// Pop the lowest-declared ready task and mark it running.
    pub fn next_ready(&mut self) -> Option<TaskId> {
        let id = self.ready.pop_first()?;
        self.status[id.0] = TaskStatus::Running;
        Some(id)
    }

    /// Whether any task is waiting to be dispatched.
    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Record a running task's terminal status and update its dependents.
    pub fn complete(&mut self, id: TaskId, status: TaskStatus) {
        if self.status.get(id.0).is_none_or(TaskStatus::is_terminal) {
            tracing::warn!(task = %id, "Ignoring completion of unknown or finished task");
            return;
        }
        let failed = matches!(status, TaskStatus::Failed(_));
        self.finish(id, status);

        if failed {
            self.skip_dependents(id);
        } else {
            self.release(id);
        }
    }

    /// Skip every task that has not started. Returns the newly skipped tasks.
    pub fn cancel_pending(&mut self) -> Vec<TaskId> {
        self.ready.clear();
        let pending: Vec<TaskId> = (0..self.status.len())
            .map(TaskId)
            .filter(|id| self.status[id.0] == TaskStatus::Pending)
            .collect();
        for id in &pending {
            self.finish(*id, TaskStatus::Skipped(SkipReason::Cancelled));
        }
        pending
    }

    /// Whether every task is terminal.
    pub fn is_finished(&self) -> bool {
        self.status.iter().all(TaskStatus::is_terminal)
    }

    /// Number of tasks currently running.
    pub fn running(&self) -> usize {
        self.status
            .iter()
            .filter(|s| **s == TaskStatus::Running)
            .count()
    }

    pub fn status(&self, id: TaskId) -> Option<&TaskStatus> {
        self.status.get(id.0)
    }

    /// Tasks in the order they reached a terminal state.
    pub fn completion_order(&self) -> &[TaskId] {
        &self.completion_order
    }

    fn finish(&mut self, id: TaskId, status: TaskStatus) {
        self.status[id.0] = status;
        self.completion_order.push(id);
    }

    /// Called when a pending task has no unfinished dependencies.
    fn settle(&mut self, id: TaskId) {
        if self.status[id.0] != TaskStatus::Pending {
            return;
        }
        let Some(node) = self.graph.node(id) else {
            return;
        };
        if self.selection.includes(node.agent) {
            self.ready.insert(id);
        } else {
            tracing::debug!(task = %node.key, role = %node.role, "Skipping task of unselected agent");
            self.finish(id, TaskStatus::Skipped(SkipReason::NotSelected));
            self.release(id);
        }
    }

    fn release(&mut self, id: TaskId) {
        let graph = Arc::clone(&self.graph);
        for dependent in graph.dependents(id) {
            let remaining = &mut self.in_degree[dependent.0];
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                self.settle(*dependent);
            }
        }
    }

    fn skip_dependents(&mut self, failed: TaskId) {
        let graph = Arc::clone(&self.graph);
        let failed_key = graph
            .node(failed)
            .map(|n| n.key.clone())
            .unwrap_or_else(|| failed.to_string());

        let mut stack: Vec<TaskId> = graph.dependents(failed).to_vec();
        while let Some(id) = stack.pop() {
            if self.status[id.0] != TaskStatus::Pending {
                continue;
            }
            self.ready.remove(&id);
            self.finish(
                id,
                TaskStatus::Skipped(SkipReason::UpstreamFailed {
                    task: failed_key.clone(),
                }),
            );
            stack.extend(graph.dependents(id).iter().rev());
        }
    }
}

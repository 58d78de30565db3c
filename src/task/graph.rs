// ABOUTME: TaskGraph - validated DAG of tasks bound to agents.
// ABOUTME: Eager validation of agent/dependency references and DFS cycle detection.

use std::collections::{BTreeSet, HashMap};

use crate::agent::{AgentId, AgentRegistry};
use crate::error::BuildError;

use super::{TaskId, TaskRef, TaskSpec};

/// A validated task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub id: TaskId,
    /// Explicit id, or `task-<n>` (1-based) when none was given.
    pub key: String,
    pub description: String,
    pub expected_output: String,
    pub agent: AgentId,
    /// Role of the assigned agent, kept for reporting.
    pub role: String,
    /// Upstream tasks in declaration order, without duplicates.
    pub dependencies: Vec<TaskId>,
}

/// Dependency graph of tasks.
///
/// Immutable once built; shared read-only by the scheduler and workers.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    dependents: Vec<Vec<TaskId>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

impl TaskGraph {
    /// Validate task declarations against the agent registry and build the graph.
    pub fn build(agents: &AgentRegistry, specs: Vec<TaskSpec>) -> Result<Self, BuildError> {
        let keys: Vec<String> = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| spec.id.clone().unwrap_or_else(|| format!("task-{}", i + 1)))
            .collect();

        let mut by_key: HashMap<&str, TaskId> = HashMap::new();
        for (i, key) in keys.iter().enumerate() {
            if by_key.insert(key.as_str(), TaskId(i)).is_some() {
                return Err(BuildError::DuplicateTaskId(key.clone()));
            }
        }

        let mut nodes = Vec::with_capacity(specs.len());
        for (i, spec) in specs.into_iter().enumerate() {
            let key = keys[i].clone();

            let agent = agents
                .id_of(&spec.agent)
                .map_err(|_| BuildError::UnknownAgent {
                    task: key.clone(),
                    role: spec.agent.clone(),
                })?;

            let mut dependencies = Vec::with_capacity(spec.depends_on.len());
            for dep in &spec.depends_on {
                let resolved = match dep {
                    TaskRef::Index(idx) if *idx < keys.len() => Some(TaskId(*idx)),
                    TaskRef::Index(_) => None,
                    TaskRef::Id(id) => by_key.get(id.as_str()).copied(),
                };
                let Some(resolved) = resolved else {
                    return Err(BuildError::UnknownDependency {
                        task: key,
                        dependency: dep.to_string(),
                    });
                };
                if !dependencies.contains(&resolved) {
                    dependencies.push(resolved);
                }
            }

            nodes.push(TaskNode {
                id: TaskId(i),
                key,
                description: spec.description,
                expected_output: spec.expected_output,
                agent,
                role: spec.agent,
                dependencies,
            });
        }

        if let Some(cycle) = detect_cycle(&nodes) {
            return Err(BuildError::Cycle {
                tasks: cycle.into_iter().map(|id| nodes[id.0].key.clone()).collect(),
            });
        }

        let mut dependents = vec![Vec::new(); nodes.len()];
        for node in &nodes {
            for dep in &node.dependencies {
                dependents[dep.0].push(node.id);
            }
        }

        Ok(Self { nodes, dependents })
    }

    /// Get a task by id.
    pub fn node(&self, id: TaskId) -> Option<&TaskNode> {
        self.nodes.get(id.0)
    }

    /// All tasks in declaration order.
    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    /// Tasks that depend directly on `id`, in declaration order.
    pub fn dependents(&self, id: TaskId) -> &[TaskId] {
        self.dependents.get(id.0).map(Vec::as_slice).unwrap_or_default()
    }

    /// Find a task by its key.
    pub fn find(&self, key: &str) -> Option<&TaskNode> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deterministic dependency order: Kahn's algorithm, ties broken by
    /// declaration position.
    pub fn topological_order(&self) -> Vec<TaskId> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.dependencies.len()).collect();
        let mut ready: BTreeSet<TaskId> = self
            .nodes
            .iter()
            .filter(|n| n.dependencies.is_empty())
            .map(|n| n.id)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_first() {
            order.push(id);
            for dependent in self.dependents(id) {
                in_degree[dependent.0] -= 1;
                if in_degree[dependent.0] == 0 {
                    ready.insert(*dependent);
                }
            }
        }
        order
    }
}

/// Depth-first search over dependency edges, visiting roots in declaration order.
///
/// Returns the first cycle found, with its starting task repeated at the end.
fn detect_cycle(nodes: &[TaskNode]) -> Option<Vec<TaskId>> {
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut path = Vec::new();

    for node in nodes {
        if marks[node.id.0] == Mark::Unvisited
            && dfs_cycle(node.id, nodes, &mut marks, &mut path)
        {
            return Some(path);
        }
    }
    None
}

fn dfs_cycle(
    id: TaskId,
    nodes: &[TaskNode],
    marks: &mut [Mark],
    path: &mut Vec<TaskId>,
) -> bool {
    match marks[id.0] {
        Mark::Done => return false,
        Mark::Visiting => {
            // Trim the path down to the cycle itself.
            if let Some(start) = path.iter().position(|p| *p == id) {
                path.drain(..start);
            }
            path.push(id);
            return true;
        }
        Mark::Unvisited => {}
    }

    marks[id.0] = Mark::Visiting;
    path.push(id);

    for dep in &nodes[id.0].dependencies {
        if dfs_cycle(*dep, nodes, marks, path) {
            return true;
        }
    }

    marks[id.0] = Mark::Done;
    path.pop();
    false
}

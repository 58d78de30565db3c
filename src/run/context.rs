// ABOUTME: RunContext - run parameters plus the write-once map of task outputs.
// ABOUTME: Formats dependency outputs into the context handed to each task.

use std::collections::HashMap;

use crate::task::{Params, TaskGraph, TaskId, TaskNode};

/// Quality of a task output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputQuality {
    Complete,
    /// The producing loop ran out of iterations.
    Degraded,
}

/// Terminal output of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    pub text: String,
    pub quality: OutputQuality,
}

/// Per-run state shared between the driver and context resolution.
///
/// Owned by the run driver, which is the only writer.
#[derive(Debug, Default)]
pub struct RunContext {
    params: Params,
    outputs: HashMap<TaskId, TaskOutput>,
}

impl RunContext {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            outputs: HashMap::new(),
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Record a task's output. A second write for the same task is rejected.
    pub fn record(&mut self, id: TaskId, output: TaskOutput) -> bool {
        if self.outputs.contains_key(&id) {
            tracing::warn!(task = %id, "Rejected second output write for task");
            return false;
        }
        self.outputs.insert(id, output);
        true
    }

    pub fn output(&self, id: TaskId) -> Option<&TaskOutput> {
        self.outputs.get(&id)
    }

    /// Format the outputs of a task's dependencies, in dependency-declaration order.
    ///
    /// Dependencies without an output (skipped because their agent was not
    /// selected) appear as an explicit upstream-skipped marker.
    pub fn resolve_context(&self, graph: &TaskGraph, node: &TaskNode) -> String {
        node.dependencies
            .iter()
            .filter_map(|dep| graph.node(*dep))
            .map(|dep| match self.outputs.get(&dep.id) {
                Some(output) => {
                    let flag = match output.quality {
                        OutputQuality::Complete => "",
                        OutputQuality::Degraded => " [degraded: partial transcript]",
                    };
                    format!(
                        "## Output of {} ({}){}\n{}",
                        dep.key, dep.description, flag, output.text
                    )
                }
                None => format!(
                    "## Output of {} ({})\n[UPSTREAM SKIPPED: no output was produced for this task]",
                    dep.key, dep.description
                ),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, AgentRegistry};
    use crate::task::TaskSpec;

    fn graph() -> TaskGraph {
        let mut agents = AgentRegistry::new();
        agents.register(Agent::new("Researcher", "research")).unwrap();
        TaskGraph::build(
            &agents,
            vec![
                TaskSpec::new("Search the web", "Researcher").id("search"),
                TaskSpec::new("Scrape pages", "Researcher").id("scrape"),
                TaskSpec::new("Write", "Researcher").depends_on("scrape").depends_on("search"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_record_is_write_once() {
        let mut ctx = RunContext::default();
        let first = TaskOutput {
            text: "first".into(),
            quality: OutputQuality::Complete,
        };
        assert!(ctx.record(TaskId(0), first.clone()));
        assert!(!ctx.record(
            TaskId(0),
            TaskOutput {
                text: "second".into(),
                quality: OutputQuality::Complete,
            }
        ));
        assert_eq!(ctx.output(TaskId(0)), Some(&first));
    }

    #[test]
    fn test_context_follows_dependency_order_and_flags() {
        let graph = graph();
        let mut ctx = RunContext::default();
        ctx.record(
            TaskId(0),
            TaskOutput {
                text: "links".into(),
                quality: OutputQuality::Complete,
            },
        );
        ctx.record(
            TaskId(1),
            TaskOutput {
                text: "[1] Researcher: called scrape".into(),
                quality: OutputQuality::Degraded,
            },
        );

        let text = ctx.resolve_context(&graph, graph.node(TaskId(2)).unwrap());
        let scrape = text.find("## Output of scrape (Scrape pages) [degraded").unwrap();
        let search = text.find("## Output of search (Search the web)\nlinks").unwrap();
        assert!(scrape < search);
    }

    #[test]
    fn test_context_marks_skipped_upstream() {
        let graph = graph();
        let ctx = RunContext::default();
        let text = ctx.resolve_context(&graph, graph.node(TaskId(2)).unwrap());
        assert!(text.contains("[UPSTREAM SKIPPED"));
    }
}

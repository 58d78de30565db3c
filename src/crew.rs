// ABOUTME: Crew facade - builds the agent registry, tool directory and task graph,
// ABOUTME: then runs them with a reasoner through the run driver.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, AgentRegistry, ExecutionLoop};
use crate::config::CrewConfig;
use crate::error::{BuildError, ConfigError, CrewError, RunError};
use crate::reasoner::Reasoner;
use crate::run::driver::{self, PreparedTask, RunPlan};
use crate::run::{CrewReport, RunSettings, Selection};
use crate::task::{Params, TaskGraph, TaskSpec, interpolate};
use crate::tool::{Tool, ToolDirectory};

/// Inputs for one run: template parameters and an optional role filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInputs {
    pub params: Params,
    /// Roles to execute. Empty means every role.
    pub roles: Vec<String>,
}

impl RunInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a template parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Shorthand for the `topic` parameter.
    pub fn topic(self, topic: impl Into<String>) -> Self {
        self.param("topic", topic)
    }

    /// Restrict the run to a role. May be called repeatedly.
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}

/// Builder for [`Crew`].
#[derive(Default)]
pub struct CrewBuilder {
    agents: Vec<Agent>,
    tasks: Vec<TaskSpec>,
    tools: ToolDirectory,
    extra_tools: Vec<Arc<dyn Tool>>,
    reasoner: Option<Arc<dyn Reasoner>>,
    settings: RunSettings,
}

impl CrewBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a crew file's agents, tasks and settings.
    pub fn from_config(config: &CrewConfig) -> Result<Self, ConfigError> {
        let (agents, tasks) = config.definitions()?;
        Ok(Self::new()
            .agents(agents)
            .tasks(tasks)
            .settings(config.run_settings()))
    }

    pub fn agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn agents(mut self, agents: impl IntoIterator<Item = Agent>) -> Self {
        self.agents.extend(agents);
        self
    }

    pub fn task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(mut self, tasks: impl IntoIterator<Item = TaskSpec>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// Replace the tool directory.
    pub fn tool_directory(mut self, tools: ToolDirectory) -> Self {
        self.tools = tools;
        self
    }

    /// Add a single tool. Name clashes are reported by [`CrewBuilder::build`].
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.extra_tools.push(Arc::new(tool));
        self
    }

    pub fn reasoner<R: Reasoner + 'static>(self, reasoner: R) -> Self {
        self.shared_reasoner(Arc::new(reasoner))
    }

    pub fn shared_reasoner(mut self, reasoner: Arc<dyn Reasoner>) -> Self {
        self.reasoner = Some(reasoner);
        self
    }

    pub fn settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate everything and produce a runnable crew.
    ///
    /// Fails on duplicate roles or tools, agents declaring unregistered tools,
    /// unresolvable task references, cycles, or a missing reasoner.
    pub fn build(self) -> Result<Crew, CrewError> {
        let mut agents = AgentRegistry::new();
        for agent in self.agents {
            agents.register(agent)?;
        }

        let mut tools = self.tools;
        for tool in self.extra_tools {
            tools.register_arc(tool)?;
        }

        agents.validate_tools(&tools)?;
        let graph = TaskGraph::build(&agents, self.tasks)?;
        let reasoner = self.reasoner.ok_or(BuildError::MissingReasoner)?;

        tracing::debug!(
            agents = agents.len(),
            tools = tools.len(),
            tasks = graph.len(),
            "Crew built"
        );

        Ok(Crew {
            agents: Arc::new(agents),
            tools: Arc::new(tools),
            graph: Arc::new(graph),
            reasoner,
            settings: self.settings,
        })
    }
}

/// A validated crew, ready to run any number of times.
#[derive(Clone)]
pub struct Crew {
    agents: Arc<AgentRegistry>,
    tools: Arc<ToolDirectory>,
    graph: Arc<TaskGraph>,
    reasoner: Arc<dyn Reasoner>,
    settings: RunSettings,
}

impl fmt::Debug for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crew")
            .field("agents", &self.agents.roles())
            .field("tools", &self.tools.list())
            .field("tasks", &self.graph.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Crew {
    pub fn builder() -> CrewBuilder {
        CrewBuilder::new()
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn tools(&self) -> &ToolDirectory {
        &self.tools
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run every selected task to a terminal state.
    pub async fn kickoff(&self, inputs: RunInputs) -> Result<CrewReport, CrewError> {
        self.kickoff_with_cancel(inputs, CancellationToken::new())
            .await
    }

    /// Like [`Crew::kickoff`], stopping early when `cancel` fires.
    ///
    /// Parameters and the role filter are checked before any task starts.
    /// A report is returned whenever at least one task produced an output;
    /// check [`CrewReport::is_error`] for partial failures.
    pub async fn kickoff_with_cancel(
        &self,
        inputs: RunInputs,
        cancel: CancellationToken,
    ) -> Result<CrewReport, CrewError> {
        let RunInputs { params, roles } = inputs;
        let selection = Selection::from_roles(&self.agents, &roles)?;
        let prepared = self.prepare_tasks(&params)?;
        let goals = self.prepare_goals(&params)?;

        // Deadlines cancel this token, never the caller's.
        let run_token = cancel.child_token();
        let runner = ExecutionLoop::new(
            Arc::clone(&self.agents),
            Arc::clone(&self.tools),
            Arc::clone(&self.reasoner),
        )
        .goals(goals)
        .cancel_token(run_token.clone())
        .iteration_timeout(self.settings.iteration_timeout);

        let plan = RunPlan {
            run_id: uuid::Uuid::new_v4().to_string(),
            graph: Arc::clone(&self.graph),
            selection,
            params,
            prepared,
            settings: self.settings.clone(),
        };

        let report = driver::drive(plan, runner, run_token).await;

        if !self.graph.is_empty() && !report.has_output() {
            let failures = report
                .outcomes
                .iter()
                .map(|o| (o.key.clone(), o.reason().unwrap_or_else(|| o.status.to_string())))
                .collect();
            return Err(RunError::NoOutput { failures }.into());
        }
        Ok(report)
    }

    fn prepare_tasks(&self, params: &Params) -> Result<Vec<PreparedTask>, RunError> {
        self.graph
            .nodes()
            .iter()
            .map(|node| {
                Ok(PreparedTask {
                    description: interpolate(
                        &node.description,
                        params,
                        &format!("task '{}' description", node.key),
                    )?,
                    expected_output: interpolate(
                        &node.expected_output,
                        params,
                        &format!("task '{}' expected output", node.key),
                    )?,
                })
            })
            .collect()
    }

    fn prepare_goals(&self, params: &Params) -> Result<Vec<String>, RunError> {
        self.agents
            .iter()
            .map(|(_, agent)| {
                interpolate(&agent.goal, params, &format!("agent '{}' goal", agent.role))
            })
            .collect()
    }
}

/// Parameters collected from `(name, value)` pairs.
pub fn params<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect::<HashMap<_, _>>()
}

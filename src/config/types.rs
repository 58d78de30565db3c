// ABOUTME: Serde model of a crew definition file (agents, tasks, run settings, reasoner).
// ABOUTME: Converts into Agent and TaskSpec declarations plus RunSettings and ReasonerConfig.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, DEFAULT_MAX_ITERATIONS};
use crate::error::ConfigError;
use crate::reasoner::ReasonerConfig;
use crate::reasoner::chat::{GROQ_BASE_URL, GROQ_DEFAULT_MODEL};
use crate::run::RunSettings;
use crate::task::{TaskRef, TaskSpec};

/// Tool names accepted in older crew files, mapped to their current name.
const LEGACY_TOOL_NAMES: &[(&str, &str)] = &[("WebScrapper", "WebScraper")];

/// Top-level crew file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewConfig {
    pub agents: Vec<AgentConfig>,

    /// Tasks declared outside any agent; these must name their agent.
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,

    #[serde(default)]
    pub settings: SettingsConfig,

    #[serde(default)]
    pub reasoner: ReasonerSection,
}

/// One agent entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub role: String,
    pub goal: String,

    #[serde(default)]
    pub backstory: String,

    #[serde(default)]
    pub tools: Vec<String>,

    #[serde(default)]
    pub allow_delegation: bool,

    #[serde(default = "default_max_iter", alias = "max_iterations")]
    pub max_iter: usize,

    /// Accepted for compatibility; logging is controlled by the subscriber.
    #[serde(default)]
    pub verbose: bool,

    /// Tasks owned by this agent.
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

fn default_max_iter() -> usize {
    DEFAULT_MAX_ITERATIONS
}

/// One task entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub id: Option<String>,

    pub description: String,

    #[serde(default)]
    pub expected_output: String,

    /// Required for top-level tasks; optional on nested ones.
    #[serde(default)]
    pub agent: Option<String>,

    #[serde(default, alias = "context")]
    pub depends_on: Vec<TaskRef>,
}

/// Run limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    #[serde(default)]
    pub run_timeout_secs: Option<u64>,

    #[serde(default)]
    pub iteration_timeout_secs: Option<u64>,
}

/// Chat-completions reasoner settings. The key itself is read from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonerSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    GROQ_BASE_URL.to_string()
}

fn default_model() -> String {
    GROQ_DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

impl Default for ReasonerSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: Some(0.0),
            max_tokens: None,
            api_key_env: default_api_key_env(),
            request_timeout_secs: None,
        }
    }
}

fn canonical_tool_name(name: &str) -> String {
    LEGACY_TOOL_NAMES
        .iter()
        .find(|(legacy, _)| *legacy == name)
        .map(|(_, current)| current.to_string())
        .unwrap_or_else(|| name.to_string())
}

impl AgentConfig {
    fn to_agent(&self) -> Agent {
        Agent::new(self.role.clone(), self.goal.clone())
            .backstory(self.backstory.clone())
            .tools(self.tools.iter().map(|t| canonical_tool_name(t)))
            .max_iterations(self.max_iter)
            .allow_delegation(self.allow_delegation)
    }
}

impl TaskConfig {
    fn to_spec(&self, agent: String) -> TaskSpec {
        TaskSpec {
            id: self.id.clone(),
            description: self.description.clone(),
            expected_output: self.expected_output.clone(),
            agent,
            depends_on: self.depends_on.clone(),
        }
    }
}

impl CrewConfig {
    /// Agent and task declarations in crew order.
    ///
    /// Nested tasks come first, in agent order, followed by top-level tasks.
    /// Index dependencies refer to positions in that combined list.
    pub fn definitions(&self) -> Result<(Vec<Agent>, Vec<TaskSpec>), ConfigError> {
        let agents = self.agents.iter().map(AgentConfig::to_agent).collect();
        let mut tasks = Vec::new();

        for agent in &self.agents {
            for task in &agent.tasks {
                if let Some(other) = task.agent.as_deref().filter(|a| *a != agent.role) {
                    return Err(ConfigError::Invalid(format!(
                        "task '{}' is nested under '{}' but names agent '{}'",
                        task.description, agent.role, other
                    )));
                }
                tasks.push(task.to_spec(agent.role.clone()));
            }
        }

        for task in &self.tasks {
            let Some(role) = task.agent.clone() else {
                return Err(ConfigError::Invalid(format!(
                    "top-level task '{}' has no agent",
                    task.description
                )));
            };
            tasks.push(task.to_spec(role));
        }

        Ok((agents, tasks))
    }

    /// Run limits, falling back to defaults for anything unset.
    pub fn run_settings(&self) -> RunSettings {
        let mut settings = RunSettings::default();
        if let Some(max) = self.settings.max_concurrency {
            settings = settings.max_concurrency(max);
        }
        if let Some(secs) = self.settings.run_timeout_secs {
            settings = settings.run_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.settings.iteration_timeout_secs {
            settings = settings.iteration_timeout(Duration::from_secs(secs));
        }
        settings
    }

    /// Reasoner config with the API key taken from the process environment.
    pub fn reasoner_config(&self) -> Result<ReasonerConfig, ConfigError> {
        self.reasoner_config_with(|name| std::env::var(name).ok())
    }

    /// Reasoner config with the API key taken from `lookup`.
    pub fn reasoner_config_with<F>(&self, lookup: F) -> Result<ReasonerConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let section = &self.reasoner;
        let api_key = lookup(&section.api_key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnv(section.api_key_env.clone()))?;

        let mut config = ReasonerConfig::new(&section.base_url, api_key, &section.model);
        if let Some(temperature) = section.temperature {
            config = config.temperature(temperature);
        }
        if let Some(max_tokens) = section.max_tokens {
            config = config.max_tokens(max_tokens);
        }
        if let Some(secs) = section.request_timeout_secs {
            config = config.request_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

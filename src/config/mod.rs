// ABOUTME: Crew definition files - agents, their tasks, run limits and reasoner settings.
// ABOUTME: Supports JSON and YAML; see CrewConfig::load.

mod loader;
mod types;

pub use types::{AgentConfig, CrewConfig, ReasonerSection, SettingsConfig, TaskConfig};

#[cfg(test)]
mod config_test;

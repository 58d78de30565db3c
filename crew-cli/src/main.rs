// ABOUTME: Command-line front-end that loads a crew file and runs it against a chat reasoner.
// ABOUTME: Prints per-task outcomes, the combined output, and a summary of failures.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use taskcrew::prelude::*;

/// Run a crew of agents over a dependency graph of tasks.
#[derive(Parser, Debug)]
#[command(name = "crew-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Crew definition file (.json, .yaml or .yml).
    #[arg(short, long)]
    config: PathBuf,

    /// Value for the `{topic}` template parameter.
    #[arg(short, long)]
    topic: Option<String>,

    /// Extra template parameters as NAME=VALUE.
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Only run tasks assigned to this role. May be repeated.
    #[arg(short, long = "role")]
    roles: Vec<String>,

    /// Maximum number of tasks running at once.
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Deadline for the whole run, in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Override the reasoner model.
    #[arg(long)]
    model: Option<String>,

    /// Override the reasoner base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

impl Cli {
    fn apply_overrides(&self, config: &mut CrewConfig) {
        if let Some(max) = self.max_concurrency {
            config.settings.max_concurrency = Some(max);
        }
        if let Some(secs) = self.timeout {
            config.settings.run_timeout_secs = Some(secs);
        }
        if let Some(model) = &self.model {
            config.reasoner.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.reasoner.base_url = base_url.clone();
        }
    }

    fn inputs(&self) -> RunInputs {
        let mut inputs = RunInputs::new();
        if let Some(topic) = &self.topic {
            inputs = inputs.topic(topic.clone());
        }
        for (name, value) in &self.params {
            inputs = inputs.param(name.clone(), value.clone());
        }
        for role in &self.roles {
            inputs = inputs.role(role.clone());
        }
        inputs
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_report(report: &CrewReport) {
    println!("Run {}\n", report.run_id);
    for outcome in &report.outcomes {
        println!(
            "- {} [{}] {} ({} iteration(s))",
            outcome.key, outcome.role, outcome.status, outcome.iterations
        );
    }
    println!("\n{}", report.output);
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let mut config = CrewConfig::load(&cli.config)
        .with_context(|| format!("loading crew file {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);

    let reasoner = ChatReasoner::new(config.reasoner_config()?)?;
    let mut tools = ToolDirectory::new();
    register_web_tools(&mut tools)?;

    let crew = CrewBuilder::from_config(&config)?
        .tool_directory(tools)
        .reasoner(reasoner)
        .build()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling run");
            on_interrupt.cancel();
        }
    });

    let report = match crew.kickoff_with_cancel(cli.inputs(), cancel).await {
        Ok(report) => report,
        Err(CrewError::Run(RunError::NoOutput { failures })) => {
            eprintln!("No task produced an output:");
            for (task, reason) in failures {
                eprintln!("- {}: {}", task, reason);
            }
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    match report.error_summary() {
        Some(summary) => {
            eprintln!("\n{}", summary);
            Ok(ExitCode::FAILURE)
        }
        None => Ok(ExitCode::SUCCESS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "crew-cli", "--config", "crew.yaml", "--topic", "Rust", "--role", "Editor", "--role",
            "Researcher", "-p", "tone=dry", "--max-concurrency", "2",
        ])
        .unwrap();
        assert_eq!(cli.roles, vec!["Editor", "Researcher"]);
        assert_eq!(cli.params, vec![("tone".to_string(), "dry".to_string())]);

        let inputs = cli.inputs();
        assert_eq!(inputs.params.get("topic").map(String::as_str), Some("Rust"));
        assert_eq!(inputs.params.len(), 2);
    }

    #[test]
    fn test_parse_param_rejects_missing_value() {
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
        assert_eq!(parse_param("a=b=c").unwrap(), ("a".into(), "b=c".into()));
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "crew-cli", "-c", "x.json", "--timeout", "30", "--model", "m", "--base-url", "http://h",
        ])
        .unwrap();
        let mut config =
            CrewConfig::from_json_str(r#"{"agents": [{"role": "A", "goal": "g"}]}"#).unwrap();
        cli.apply_overrides(&mut config);
        assert_eq!(config.settings.run_timeout_secs, Some(30));
        assert_eq!(config.reasoner.model, "m");
        assert_eq!(config.reasoner.base_url, "http://h");
    }
}

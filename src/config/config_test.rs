// ABOUTME: Tests for crew config parsing, conversion, and file loading.
// ABOUTME: Covers nested and top-level tasks, defaults, aliases, and error cases.

use std::io::Write;
use std::time::Duration;

use super::*;
use crate::error::ConfigError;
use crate::task::TaskRef;

const RESEARCH_JSON: &str = r#"{
    "agents": [
        {
            "role": "Researcher",
            "goal": "Search the internet for information on {topic}",
            "backstory": "A curious analyst.",
            "tools": ["DuckDuckGoSearch", "WebScrapper"],
            "allow_delegation": false,
            "max_iter": 5,
            "verbose": true,
            "tasks": [
                {"id": "research", "description": "Research {topic}", "expected_output": "notes"}
            ]
        },
        {
            "role": "Editor",
            "goal": "Write an article about {topic}",
            "allow_delegation": true
        }
    ],
    "tasks": [
        {"description": "Write it up", "agent": "Editor", "context": ["research"]}
    ],
    "settings": {"max_concurrency": 2, "run_timeout_secs": 60}
}"#;

const RESEARCH_YAML: &str = r#"
agents:
  - role: Researcher
    goal: Search the internet for information on {topic}
    tools: [DuckDuckGoSearch]
    max_iterations: 3
    tasks:
      - description: Research {topic}
  - role: Editor
    goal: Write an article about {topic}
    tasks:
      - description: Write it up
        depends_on: [0]
reasoner:
  model: mixtral-8x7b-32768
  api_key_env: CREW_KEY
  max_tokens: 512
"#;

#[test]
fn test_json_definitions() {
    let config = CrewConfig::from_json_str(RESEARCH_JSON).unwrap();
    let (agents, tasks) = config.definitions().unwrap();

    assert_eq!(agents.len(), 2);
    assert_eq!(agents[0].role, "Researcher");
    assert_eq!(agents[0].max_iterations, 5);
    assert_eq!(agents[0].tools, vec!["DuckDuckGoSearch", "WebScraper"]);
    assert!(!agents[0].allow_delegation);
    assert!(agents[1].allow_delegation);
    assert_eq!(agents[1].max_iterations, crate::agent::DEFAULT_MAX_ITERATIONS);

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id.as_deref(), Some("research"));
    assert_eq!(tasks[0].agent, "Researcher");
    assert_eq!(tasks[1].agent, "Editor");
    assert_eq!(tasks[1].depends_on, vec![TaskRef::Id("research".into())]);
}

#[test]
fn test_json_settings() {
    let config = CrewConfig::from_json_str(RESEARCH_JSON).unwrap();
    let settings = config.run_settings();
    assert_eq!(settings.max_concurrency, 2);
    assert_eq!(settings.run_timeout, Some(Duration::from_secs(60)));
    assert_eq!(settings.iteration_timeout, None);
}

#[test]
fn test_yaml_definitions_and_aliases() {
    let config = CrewConfig::from_yaml_str(RESEARCH_YAML).unwrap();
    let (agents, tasks) = config.definitions().unwrap();

    assert_eq!(agents[0].max_iterations, 3);
    assert_eq!(agents[1].backstory, "");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1].depends_on, vec![TaskRef::Index(0)]);
    assert!(tasks[0].id.is_none());
}

#[test]
fn test_reasoner_config_from_lookup() {
    let config = CrewConfig::from_yaml_str(RESEARCH_YAML).unwrap();
    let reasoner = config
        .reasoner_config_with(|name| (name == "CREW_KEY").then(|| "secret".to_string()))
        .unwrap();

    assert_eq!(reasoner.api_key, "secret");
    assert_eq!(reasoner.model, "mixtral-8x7b-32768");
    assert_eq!(reasoner.max_tokens, Some(512));
    assert_eq!(reasoner.base_url, crate::reasoner::chat::GROQ_BASE_URL);
}

#[test]
fn test_reasoner_defaults_to_groq() {
    let config = CrewConfig::from_json_str(RESEARCH_JSON).unwrap();
    assert_eq!(config.reasoner, ReasonerSection::default());

    let reasoner = config
        .reasoner_config_with(|_| Some("k".to_string()))
        .unwrap();
    assert_eq!(reasoner.model, crate::reasoner::chat::GROQ_DEFAULT_MODEL);
    assert_eq!(reasoner.temperature, Some(0.0));
}

#[test]
fn test_missing_api_key() {
    let config = CrewConfig::from_json_str(RESEARCH_JSON).unwrap();
    let err = config.reasoner_config_with(|_| None).unwrap_err();
    assert!(matches!(err, ConfigError::MissingEnv(ref name) if name == "GROQ_API_KEY"));

    let err = config
        .reasoner_config_with(|_| Some("   ".to_string()))
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingEnv(_)));
}

#[test]
fn test_top_level_task_needs_agent() {
    let json = r#"{"agents": [{"role": "A", "goal": "g"}], "tasks": [{"description": "d"}]}"#;
    let config = CrewConfig::from_json_str(json).unwrap();
    assert!(matches!(
        config.definitions().unwrap_err(),
        ConfigError::Invalid(_)
    ));
}

#[test]
fn test_nested_task_with_other_agent_rejected() {
    let json = r#"{"agents": [
        {"role": "A", "goal": "g", "tasks": [{"description": "d", "agent": "B"}]},
        {"role": "B", "goal": "g"}
    ]}"#;
    let config = CrewConfig::from_json_str(json).unwrap();
    let err = config.definitions().unwrap_err();
    assert!(err.to_string().contains("nested under 'A'"));
}

#[test]
fn test_missing_required_field() {
    let err = CrewConfig::from_json_str(r#"{"agents": [{"role": "A"}]}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn test_load_json_and_yaml_files() {
    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("crew.json");
    std::fs::write(&json_path, RESEARCH_JSON).unwrap();
    let config = CrewConfig::load(&json_path).unwrap();
    assert_eq!(config.agents.len(), 2);

    let yaml_path = dir.path().join("crew.YML");
    let mut file = std::fs::File::create(&yaml_path).unwrap();
    file.write_all(RESEARCH_YAML.as_bytes()).unwrap();
    drop(file);
    let config = CrewConfig::load(&yaml_path).unwrap();
    assert_eq!(config.reasoner.api_key_env, "CREW_KEY");
}

#[test]
fn test_load_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crew.toml");
    std::fs::write(&path, "agents = []").unwrap();
    assert!(matches!(
        CrewConfig::load(&path).unwrap_err(),
        ConfigError::UnsupportedFormat(_)
    ));
}

#[test]
fn test_load_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = CrewConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.json"));
}

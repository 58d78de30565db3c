// ABOUTME: Integration tests running whole crews through the public API.
// ABOUTME: Reasoners and tools are closure-backed fakes; no network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskcrew::prelude::*;
use tokio_util::sync::CancellationToken;

fn search_tool() -> FnTool {
    FnTool::new("Search", "Search the web", |_| async {
        Ok(ToolResult::text("data"))
    })
}

fn researcher() -> Agent {
    Agent::new("Researcher", "Find facts about {topic}").tools(["Search"])
}

fn editor() -> Agent {
    Agent::new("Editor", "Write about {topic}")
}

/// Last line of the upstream context, i.e. the body of the final section.
fn last_context_line(prompt: &Prompt) -> String {
    prompt.context.lines().last().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_research_then_edit_pipeline() {
    let reasoner = FnReasoner::new(|prompt, _, _| async move {
        Ok(match prompt.role.as_str() {
            "Researcher" => Decision::final_answer("summary of data"),
            _ => Decision::final_answer(format!("report: {}", last_context_line(&prompt))),
        })
    });

    let crew = Crew::builder()
        .agent(researcher())
        .agent(editor())
        .tool(search_tool())
        .task(TaskSpec::new("Research {topic}", "Researcher"))
        .task(TaskSpec::new("Edit the research on {topic}", "Editor").depends_on(0))
        .reasoner(reasoner)
        .build()
        .unwrap();

    let report = crew.kickoff(RunInputs::new().topic("X")).await.unwrap();

    assert!(!report.is_error());
    let t1 = report.outcome("task-1").unwrap();
    let t2 = report.outcome("task-2").unwrap();
    assert_eq!(t1.status, TaskStatus::Succeeded);
    assert_eq!(t2.status, TaskStatus::Succeeded);
    assert_eq!(t1.iterations, 1);
    assert_eq!(t2.iterations, 1);
    assert!(report.output.contains("report: summary of data"));
    assert_eq!(report.completion_order, vec!["task-1", "task-2"]);
}

#[tokio::test]
async fn test_exhausted_budget_degrades_and_dependents_run() {
    let editor_context = Arc::new(Mutex::new(String::new()));
    let seen = Arc::clone(&editor_context);

    let reasoner = FnReasoner::new(move |prompt, _, _| {
        let seen = Arc::clone(&seen);
        async move {
            Ok(match prompt.role.as_str() {
                "Researcher" => Decision::tool_call("Search", serde_json::json!({"query": "X"})),
                _ => {
                    *seen.lock().unwrap() = prompt.context.clone();
                    Decision::final_answer("edited")
                }
            })
        }
    });

    let crew = Crew::builder()
        .agent(researcher().max_iterations(1))
        .agent(editor())
        .tool(search_tool())
        .task(TaskSpec::new("Research {topic}", "Researcher"))
        .task(TaskSpec::new("Edit", "Editor").depends_on(0))
        .reasoner(reasoner)
        .build()
        .unwrap();

    let report = crew.kickoff(RunInputs::new().topic("X")).await.unwrap();

    let t1 = report.outcome("task-1").unwrap();
    assert_eq!(t1.status, TaskStatus::DegradedComplete);
    assert_eq!(t1.iterations, 1);
    assert_eq!(t1.transcript.len(), 1);
    assert_eq!(report.outcome("task-2").unwrap().status, TaskStatus::Succeeded);

    let context = editor_context.lock().unwrap().clone();
    assert!(context.contains("[degraded: partial transcript]"));
    assert!(context.contains("called Search"));
    assert!(context.contains("observation: data"));
    assert!(report.output.contains("[DEGRADED: task-1"));
}

#[tokio::test]
async fn test_unauthorized_tool_is_recoverable() {
    let reasoner = FnReasoner::new(|_, _, transcript: Transcript| async move {
        if transcript.is_empty() {
            Ok(Decision::tool_call("Search", serde_json::json!({"query": "X"})))
        } else {
            Ok(Decision::final_answer("done without tools"))
        }
    });

    let crew = Crew::builder()
        .agent(researcher())
        .agent(editor())
        .tool(search_tool())
        .task(TaskSpec::new("Edit", "Editor"))
        .reasoner(reasoner)
        .build()
        .unwrap();

    let report = crew.kickoff(RunInputs::new().topic("X")).await.unwrap();
    let outcome = report.outcome("task-1").unwrap();

    assert_eq!(outcome.status, TaskStatus::Succeeded);
    assert_eq!(outcome.iterations, 2);
    match &outcome.transcript.entries()[0].step {
        Step::ToolCall {
            is_error, output, ..
        } => {
            assert!(is_error);
            assert!(output.contains("not authorized"));
        }
        other => panic!("unexpected step: {other:?}"),
    }
}

#[tokio::test]
async fn test_failure_skips_exactly_transitive_dependents() {
    let reasoner = FnReasoner::new(|prompt, _, _| async move {
        if prompt.task_key == "fetch" {
            Err(ReasonerError::Protocol("model refused".into()))
        } else {
            Ok(Decision::final_answer(format!("done {}", prompt.task_key)))
        }
    });

    let crew = Crew::builder()
        .agent(researcher())
        .agent(editor())
        .tool(search_tool())
        .task(TaskSpec::new("Fetch", "Researcher").id("fetch"))
        .task(TaskSpec::new("Summarize", "Editor").id("summary").depends_on("fetch"))
        .task(TaskSpec::new("Publish", "Editor").id("publish").depends_on("summary"))
        .task(TaskSpec::new("Unrelated", "Researcher").id("sibling"))
        .reasoner(reasoner)
        .build()
        .unwrap();

    let report = crew.kickoff(RunInputs::new().topic("X")).await.unwrap();

    assert!(report.is_error());
    assert!(matches!(
        report.outcome("fetch").unwrap().status,
        TaskStatus::Failed(TaskFailure::Reasoner(_))
    ));
    for key in ["summary", "publish"] {
        assert!(matches!(
            report.outcome(key).unwrap().status,
            TaskStatus::Skipped(SkipReason::UpstreamFailed { .. })
        ));
    }
    assert_eq!(report.outcome("sibling").unwrap().status, TaskStatus::Succeeded);
    assert_eq!(report.failed(), vec!["fetch"]);
    assert_eq!(report.skipped(), vec!["summary", "publish"]);

    let summary = report.error_summary().unwrap();
    assert!(summary.contains("fetch"));
    assert!(summary.contains("publish"));
    assert!(report.clone().into_result().is_err());
}

#[tokio::test]
async fn test_cancel_keeps_finished_output_and_skips_rest() {
    let token = CancellationToken::new();
    let trigger = token.clone();

    let reasoner = FnReasoner::new(move |prompt, _, _| {
        let trigger = trigger.clone();
        async move {
            if prompt.task_key == "task-1" {
                trigger.cancel();
            }
            Ok(Decision::final_answer(format!("answer for {}", prompt.task_key)))
        }
    });

    let crew = Crew::builder()
        .agent(researcher())
        .agent(editor())
        .tool(search_tool())
        .task(TaskSpec::new("A", "Researcher"))
        .task(TaskSpec::new("B", "Editor"))
        .settings(RunSettings::default().max_concurrency(1))
        .reasoner(reasoner)
        .build()
        .unwrap();

    let report = crew
        .kickoff_with_cancel(RunInputs::new().topic("X"), token)
        .await
        .unwrap();

    let a = report.outcome("task-1").unwrap();
    assert_eq!(a.status, TaskStatus::Succeeded);
    assert_eq!(a.output.as_deref(), Some("answer for task-1"));
    assert_eq!(
        report.outcome("task-2").unwrap().status,
        TaskStatus::Skipped(SkipReason::Cancelled)
    );
    assert_eq!(report.outcome("task-2").unwrap().iterations, 0);
}

fn tracking_reasoner(active: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> FnReasoner {
    FnReasoner::new(move |prompt, _, _| {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(Decision::final_answer(prompt.task_key))
        }
    })
}

async fn peak_concurrency(max_concurrency: usize) -> usize {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut builder = Crew::builder()
        .agent(researcher())
        .tool(search_tool())
        .settings(RunSettings::default().max_concurrency(max_concurrency))
        .reasoner(tracking_reasoner(Arc::clone(&active), Arc::clone(&peak)));
    for i in 0..4 {
        builder = builder.task(TaskSpec::new(format!("Independent {i}"), "Researcher"));
    }

    let report = builder
        .build()
        .unwrap()
        .kickoff(RunInputs::new().topic("X"))
        .await
        .unwrap();
    assert!(!report.is_error());
    peak.load(Ordering::SeqCst)
}

#[tokio::test]
async fn test_independent_tasks_run_concurrently_within_bound() {
    assert_eq!(peak_concurrency(2).await, 2);
    assert_eq!(peak_concurrency(1).await, 1);
}

#[tokio::test]
async fn test_role_filter_passes_through_unselected_tasks() {
    let reasoner = FnReasoner::new(|prompt, _, _| async move {
        Ok(Decision::final_answer(format!("context was: {}", prompt.context)))
    });

    let crew = Crew::builder()
        .agent(researcher())
        .agent(editor())
        .tool(search_tool())
        .task(TaskSpec::new("Research", "Researcher"))
        .task(TaskSpec::new("Edit", "Editor").depends_on(0))
        .reasoner(reasoner)
        .build()
        .unwrap();

    let report = crew
        .kickoff(RunInputs::new().topic("X").role("Editor"))
        .await
        .unwrap();

    assert_eq!(
        report.outcome("task-1").unwrap().status,
        TaskStatus::Skipped(SkipReason::NotSelected)
    );
    let edit = report.outcome("task-2").unwrap();
    assert_eq!(edit.status, TaskStatus::Succeeded);
    assert!(edit.output.as_deref().unwrap().contains("[UPSTREAM SKIPPED"));
}

#[tokio::test]
async fn test_delegation_hands_task_to_coworker() {
    let reasoner = FnReasoner::new(|prompt, _, _| async move {
        Ok(match prompt.role.as_str() {
            "Editor" => {
                assert_eq!(prompt.coworkers, vec!["Researcher"]);
                Decision::delegate("Researcher", "Dig up the numbers")
            }
            _ => {
                assert!(prompt.coworkers.is_empty());
                Decision::final_answer("numbers found")
            }
        })
    });

    let crew = Crew::builder()
        .agent(researcher())
        .agent(editor().allow_delegation(true).max_iterations(3))
        .tool(search_tool())
        .task(TaskSpec::new("Write", "Editor"))
        .reasoner(reasoner)
        .build()
        .unwrap();

    let report = crew.kickoff(RunInputs::new().topic("X")).await.unwrap();
    let outcome = report.outcome("task-1").unwrap();

    assert_eq!(outcome.status, TaskStatus::Succeeded);
    assert_eq!(outcome.output.as_deref(), Some("numbers found"));
    assert_eq!(outcome.iterations, 2);
    assert!(matches!(
        outcome.transcript.entries()[0].step,
        Step::Delegation { ref to, .. } if to == "Researcher"
    ));
}

#[tokio::test]
async fn test_missing_parameter_starts_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let reasoner = FnReasoner::new(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(Decision::final_answer("x")) }
    });

    let crew = Crew::builder()
        .agent(researcher())
        .tool(search_tool())
        .task(TaskSpec::new("Research", "Researcher"))
        .reasoner(reasoner)
        .build()
        .unwrap();

    let err = crew.kickoff(RunInputs::new()).await.unwrap_err();
    assert!(matches!(
        err,
        CrewError::Run(RunError::MissingParameter { ref name, .. }) if name == "topic"
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_build_errors() {
    let err = Crew::builder()
        .agent(researcher())
        .reasoner(FnReasoner::echo())
        .build()
        .unwrap_err();
    assert!(matches!(err, CrewError::Build(BuildError::UnknownTool { .. })));

    let err = Crew::builder()
        .agent(editor())
        .task(TaskSpec::new("A", "Editor").id("a").depends_on("b"))
        .task(TaskSpec::new("B", "Editor").id("b").depends_on("a"))
        .reasoner(FnReasoner::echo())
        .build()
        .unwrap_err();
    assert!(matches!(err, CrewError::Build(BuildError::Cycle { .. })));

    let err = Crew::builder()
        .agent(editor())
        .task(TaskSpec::new("A", "Ghost"))
        .reasoner(FnReasoner::echo())
        .build()
        .unwrap_err();
    assert!(matches!(err, CrewError::Build(BuildError::UnknownAgent { .. })));

    let err = Crew::builder()
        .agent(editor())
        .task(TaskSpec::new("A", "Editor").depends_on(5))
        .reasoner(FnReasoner::echo())
        .build()
        .unwrap_err();
    assert!(matches!(err, CrewError::Build(BuildError::UnknownDependency { .. })));
}

#[tokio::test]
async fn test_dependencies_finish_before_dependents() {
    let crew = Crew::builder()
        .agent(editor())
        .task(TaskSpec::new("root", "Editor").id("root"))
        .task(TaskSpec::new("left", "Editor").id("left").depends_on("root"))
        .task(TaskSpec::new("right", "Editor").id("right").depends_on("root"))
        .task(
            TaskSpec::new("join", "Editor")
                .id("join")
                .depends_on("left")
                .depends_on("right"),
        )
        .reasoner(FnReasoner::echo())
        .build()
        .unwrap();

    let report = crew.kickoff(RunInputs::new().topic("X")).await.unwrap();
    let position = |key: &str| {
        report
            .completion_order
            .iter()
            .position(|k| k == key)
            .unwrap()
    };
    assert!(position("root") < position("left"));
    assert!(position("root") < position("right"));
    assert!(position("left") < position("join"));
    assert!(position("right") < position("join"));
}

#[tokio::test]
async fn test_run_timeout_cancels_in_flight_and_pending() {
    let reasoner = FnReasoner::new(|_, _, _| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(Decision::final_answer("too late"))
    });

    let crew = Crew::builder()
        .agent(editor())
        .task(TaskSpec::new("slow", "Editor"))
        .task(TaskSpec::new("queued", "Editor"))
        .settings(
            RunSettings::default()
                .max_concurrency(1)
                .run_timeout(Duration::from_millis(50)),
        )
        .reasoner(reasoner)
        .build()
        .unwrap();

    let err = crew.kickoff(RunInputs::new().topic("X")).await.unwrap_err();
    let CrewError::Run(RunError::NoOutput { failures }) = err else {
        panic!("expected NoOutput, got {err}");
    };
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0], ("task-1".to_string(), "cancelled".to_string()));
    assert_eq!(failures[1].0, "task-2");
}

#[tokio::test]
async fn test_iteration_deadline_fails_task_and_cancels_run() {
    let reasoner = FnReasoner::new(|prompt, _, _| async move {
        if prompt.task_key == "slow" {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        Ok(Decision::final_answer(format!("{} done", prompt.task_key)))
    });

    let crew = Crew::builder()
        .agent(editor())
        .task(TaskSpec::new("fast", "Editor").id("fast"))
        .task(TaskSpec::new("slow", "Editor").id("slow"))
        .task(TaskSpec::new("after", "Editor").id("after"))
        .settings(
            RunSettings::default()
                .max_concurrency(1)
                .iteration_timeout(Duration::from_millis(50)),
        )
        .reasoner(reasoner)
        .build()
        .unwrap();

    let report = crew.kickoff(RunInputs::new().topic("X")).await.unwrap();
    assert_eq!(report.outcome("fast").unwrap().status, TaskStatus::Succeeded);
    assert_eq!(
        report.outcome("slow").unwrap().status,
        TaskStatus::Failed(TaskFailure::DeadlineExceeded)
    );
    assert_eq!(
        report.outcome("after").unwrap().status,
        TaskStatus::Skipped(SkipReason::Cancelled)
    );
}

#[tokio::test]
async fn test_no_output_is_an_error() {
    let reasoner = FnReasoner::new(|_, _, _| async {
        Err(ReasonerError::Configuration("no key".into()))
    });

    let crew = Crew::builder()
        .agent(editor())
        .task(TaskSpec::new("only", "Editor"))
        .reasoner(reasoner)
        .build()
        .unwrap();

    let err = crew.kickoff(RunInputs::new().topic("X")).await.unwrap_err();
    match err {
        CrewError::Run(RunError::NoOutput { failures }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "task-1");
            assert!(failures[0].1.contains("reasoner failed"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_crew_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crew.yaml");
    std::fs::write(
        &path,
        r#"
agents:
  - role: Researcher
    goal: Search the internet for information on {topic}
    tools: [DuckDuckGoSearch, WebScrapper]
    max_iter: 5
    tasks:
      - id: research
        description: Research {topic}
        expected_output: Key facts about {topic}
  - role: Editor
    goal: Write an article about {topic}
tasks:
  - description: Write an article about {topic}
    agent: Editor
    context: [research]
settings:
  max_concurrency: 2
"#,
    )
    .unwrap();

    let config = CrewConfig::load(&path).unwrap();
    let mut tools = ToolDirectory::new();
    register_web_tools(&mut tools).unwrap();

    let crew = CrewBuilder::from_config(&config)
        .unwrap()
        .tool_directory(tools)
        .reasoner(FnReasoner::echo())
        .build()
        .unwrap();

    assert_eq!(crew.settings().max_concurrency, 2);
    assert_eq!(crew.agents().lookup("Researcher").unwrap().max_iterations, 5);
    assert!(crew.agents().lookup("Researcher").unwrap().can_use("WebScraper"));

    let report = crew.kickoff(RunInputs::new().topic("Rust")).await.unwrap();
    assert_eq!(report.completion_order, vec!["research", "task-2"]);
    assert_eq!(
        report.output,
        "Researcher: Research Rust\n\nEditor: Write an article about Rust"
    );
}

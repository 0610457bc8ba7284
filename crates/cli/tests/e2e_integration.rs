//! End-to-end integration tests for the Thoughtline reasoning executor.
//!
//! These tests exercise the full pipeline from configuration to final
//! answer: config loading, the built-in tool registry, permission gating,
//! and the reasoning engine, with only the model scripted.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thoughtline_agent::{HistoryKind, PromptBuilder, ReasoningEngine, StatusUpdate};
use thoughtline_config::AppConfig;
use thoughtline_core::agent::AgentConfig;
use thoughtline_core::error::{AgentError, ModelError};
use thoughtline_core::model::{CompletionRequest, ModelClient};
use thoughtline_core::permission::{AllowAll, PermissionGate, StaticPermissions};
use thoughtline_tools::default_registry;

// ── Mock Model ───────────────────────────────────────────────────────────

/// A mock model that returns scripted responses in sequence.
struct ScriptedModel {
    responses: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().rev().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    fn slow(responses: &[&str], delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(responses)
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.prompts.lock().unwrap().push(request.prompt);
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| ModelError::Unavailable("script exhausted".into()))
    }
}

fn engine_with(
    model: Arc<ScriptedModel>,
    permissions: Arc<dyn PermissionGate>,
    config: AgentConfig,
) -> ReasoningEngine {
    let tools = Arc::new(default_registry().unwrap());
    ReasoningEngine::new(model, tools, permissions, config).unwrap()
}

// ── E2E: Full Reasoning Pipeline ─────────────────────────────────────────

#[tokio::test]
async fn e2e_current_time_then_answer() {
    let model = Arc::new(ScriptedModel::new(&[
        "Action: {tool: getCurrentTime}",
        "Final Answer: It is noon",
    ]));
    let config = AgentConfig::default()
        .with_max_iterations(3)
        .with_timeout_ms(5000)
        .with_retry_attempts(1);
    let mut engine = engine_with(model.clone(), Arc::new(AllowAll), config);

    let result = engine
        .run("What time is it?")
        .await
        .expect("Run should succeed");

    assert!(result.success);
    assert_eq!(result.final_answer, "It is noon");
    assert_eq!(result.total_steps, 3);
    assert_eq!(model.calls(), 2);

    // The real clock tool answered with an RFC 3339 timestamp.
    let observation = &engine.snapshot()[1];
    assert_eq!(observation.kind, HistoryKind::Observation);
    assert!(observation.text.contains('T'), "{}", observation.text);
    assert!(!observation.text.starts_with("Error"));
}

#[tokio::test]
async fn e2e_calculator_result_reaches_next_prompt() {
    let model = Arc::new(ScriptedModel::new(&[
        "Thought: I need to multiply.\nAction: {\"tool\": \"calculate\", \"args\": {\"expression\": \"(2 + 3) * 4\"}}",
        "Final Answer: 20",
    ]));
    let mut engine = engine_with(model.clone(), Arc::new(AllowAll), AgentConfig::default());

    let result = engine.run("What is (2+3)*4?").await.unwrap();
    assert_eq!(result.final_answer, "20");
    assert_eq!(result.steps[0], "Thought: I need to multiply.");
    assert_eq!(result.steps[2], "Observation: 20");

    let prompts = model.prompts();
    assert!(prompts[1].contains("Observation: 20"));
    assert!(prompts[0].contains("- calculate [math]"));
}

#[tokio::test]
async fn e2e_weather_denied_without_location_permission() {
    let model = Arc::new(ScriptedModel::new(&[
        "Action: getWeather\nAction Input: {\"location\": \"Tokyo\"}",
        "Final Answer: I am not allowed to check the weather.",
    ]));
    let mut engine = engine_with(
        model,
        Arc::new(StaticPermissions::new()),
        AgentConfig::default(),
    );

    let result = engine.run("Weather in Tokyo?").await.unwrap();
    assert!(result.success);
    assert!(result.steps[1].contains("Permission denied"));
    assert!(result.steps[1].contains("location"));
}

#[tokio::test]
async fn e2e_weather_with_permissions_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
model = "test-model"

[agent]
max_iterations = 4
timeout_ms = 10000

[permissions]
granted = ["location"]
"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&path).unwrap();
    let model = Arc::new(ScriptedModel::new(&[
        "Action: {tool: getWeather, args: {location: Tokyo, units: imperial}}",
        "Final Answer: It's mild in Tokyo.",
    ]));
    let mut engine = engine_with(
        model,
        Arc::new(config.permissions.to_gate()),
        config.agent.clone(),
    );
    assert_eq!(engine.config().max_iterations, 4);

    let result = engine.run("Weather in Tokyo?").await.unwrap();
    let observation: serde_json::Value =
        serde_json::from_str(result.steps[1].trim_start_matches("Observation: ")).unwrap();
    assert_eq!(observation["location"], "Tokyo");
    assert_eq!(observation["units"], "°F");
}

#[tokio::test]
async fn e2e_unknown_tool_then_recovery() {
    let model = Arc::new(ScriptedModel::new(&[
        "Action: {tool: searchTheWeb, args: {query: rust}}",
        "Thought: That tool does not exist; I will answer directly.",
        "Final Answer: Rust is a systems language.",
    ]));
    let mut engine = engine_with(model.clone(), Arc::new(AllowAll), AgentConfig::default());

    let result = engine.run("What is Rust?").await.unwrap();
    assert_eq!(result.final_answer, "Rust is a systems language.");
    assert!(result.steps[1].contains("Tool not found: searchTheWeb"));
    assert_eq!(model.calls(), 3);
}

#[tokio::test]
async fn e2e_unparseable_model_hits_iteration_cap() {
    let responses = ["I refuse to use the format."; 3];
    let model = Arc::new(ScriptedModel::new(&responses));
    let mut engine = engine_with(
        model.clone(),
        Arc::new(AllowAll),
        AgentConfig::default().with_max_iterations(3),
    );

    let err = engine.run("Anything").await.unwrap_err();
    assert!(matches!(
        err,
        AgentError::MaxIterationsExceeded { max_iterations: 3 }
    ));
    assert!(err.to_string().contains('3'));
    assert_eq!(model.calls(), 3);
    assert_eq!(
        engine
            .snapshot()
            .iter()
            .filter(|e| e.kind == HistoryKind::Observation)
            .count(),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn e2e_timeout_reports_budget() {
    let model = Arc::new(ScriptedModel::slow(
        &["Final Answer: late"],
        Duration::from_secs(30),
    ));
    let mut engine = engine_with(
        model,
        Arc::new(AllowAll),
        AgentConfig::default().with_timeout_ms(1_000),
    );

    let err = engine.run("Slow question").await.unwrap_err();
    assert!(matches!(err, AgentError::Timeout { timeout_ms: 1_000 }));
}

#[tokio::test]
async fn e2e_status_stream_tracks_run() {
    let model = Arc::new(ScriptedModel::new(&[
        "Action: {tool: calculate, expression: 6 * 7}",
        "Final Answer: 42",
    ]));
    let mut engine = engine_with(model, Arc::new(AllowAll), AgentConfig::default());
    let mut rx = engine.status_mut().channel();

    engine.run("6 times 7?").await.unwrap();

    let mut actions = Vec::new();
    let mut last_progress = 0.0f32;
    while let Ok(update) = rx.try_recv() {
        match update {
            StatusUpdate::Delta(delta) => {
                if let Some(Some(action)) = delta.current_action {
                    actions.push(action);
                }
                if let Some(p) = delta.progress {
                    assert!(p >= last_progress);
                    last_progress = p;
                }
            }
            StatusUpdate::Snapshot(status) => assert_eq!(status.progress, 0.0),
            StatusUpdate::Fragment(_) => {}
        }
    }
    assert_eq!(actions, vec!["Using calculate".to_string()]);
    assert_eq!(last_progress, 1.0);
    assert!(!engine.status().is_thinking);
}

#[tokio::test]
async fn e2e_custom_preamble_reaches_model() {
    let model = Arc::new(ScriptedModel::new(&["Final Answer: hi"]));
    let mut engine = engine_with(model.clone(), Arc::new(AllowAll), AgentConfig::default())
        .with_prompt_builder(PromptBuilder::new().with_preamble("You are the e2e bot."));

    engine.run("hello").await.unwrap();
    assert!(model.prompts()[0].starts_with("You are the e2e bot."));
}

#[test]
fn e2e_local_provider_builds_without_key() {
    let config = AppConfig {
        base_url: "http://localhost:11434/v1".into(),
        ..AppConfig::default()
    };
    let model = thoughtline_providers::build_from_config(&config).unwrap();
    assert_eq!(model.name(), "local");
}

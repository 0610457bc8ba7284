//! `thoughtline run` — Answer one question with the reasoning loop.

use std::io::Write;
use std::sync::Arc;
use thoughtline_agent::{ReasoningEngine, StatusUpdate};
use thoughtline_config::AppConfig;
use thoughtline_core::agent::{AgentConfig, UnstructuredPolicy};
use thoughtline_core::error::ModelError;

pub struct RunOptions {
    pub query: String,
    pub max_iterations: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub permissive: bool,
    pub stream: bool,
    pub trace: bool,
}

pub async fn run(opts: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let model = match thoughtline_providers::build_from_config(&config) {
        Ok(model) => model,
        Err(ModelError::NotConfigured(reason)) => {
            eprintln!();
            eprintln!("  ERROR: {reason}");
            eprintln!();
            eprintln!("  Set one of these environment variables:");
            eprintln!("    THOUGHTLINE_API_KEY = 'sk-...'   (generic)");
            eprintln!("    OPENAI_API_KEY      = 'sk-...'   (for OpenAI direct)");
            eprintln!();
            eprintln!("  Or add it to your config file:");
            eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
            eprintln!();
            return Err("No API key found. See above for setup instructions.".into());
        }
        Err(e) => return Err(e.into()),
    };

    let tools = Arc::new(thoughtline_tools::default_registry()?);
    let permissions = Arc::new(config.permissions.to_gate());
    let agent_config = agent_config(&config, &opts);
    let streaming = agent_config.stream;

    let mut engine = ReasoningEngine::new(model, tools, permissions, agent_config)?
        .with_request_on_denied(config.permissions.request_on_denied);
    engine
        .status_mut()
        .subscribe(move |update| print_status(update, streaming));

    let result = engine.run(&opts.query).await;

    if opts.trace {
        eprintln!();
        for line in engine.history().lines() {
            eprintln!("  {line}");
        }
        eprintln!();
    }

    let result = result?;
    println!("{}", result.final_answer);
    eprintln!(
        "  ({} steps in {} ms)",
        result.total_steps, result.execution_time_ms
    );
    Ok(())
}

/// Merge command-line overrides into the configured agent settings.
fn agent_config(config: &AppConfig, opts: &RunOptions) -> AgentConfig {
    let mut agent = config.agent.clone();
    if let Some(max) = opts.max_iterations {
        agent.max_iterations = max;
    }
    if let Some(timeout_ms) = opts.timeout_ms {
        agent.timeout_ms = timeout_ms;
    }
    if opts.permissive {
        agent.unstructured_policy = UnstructuredPolicy::Permissive;
    }
    if opts.stream {
        agent.stream = true;
    }
    agent
}

/// Status goes to stderr so stdout carries only the answer.
fn print_status(update: &StatusUpdate, streaming: bool) {
    match update {
        StatusUpdate::Delta(delta) => {
            if let Some(Some(step)) = &delta.step {
                let percent = delta.progress.map(|p| p * 100.0);
                match percent {
                    Some(p) => eprintln!("  [{p:>3.0}%] {step}"),
                    None => eprintln!("  [    ] {step}"),
                }
            }
            if let Some(Some(action)) = &delta.current_action {
                eprintln!("         → {action}");
            }
        }
        StatusUpdate::Fragment(text) if streaming => {
            eprint!("{text}");
            let _ = std::io::stderr().flush();
        }
        StatusUpdate::Snapshot(_) | StatusUpdate::Fragment(_) => {}
    }
}

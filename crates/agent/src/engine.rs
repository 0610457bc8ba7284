//! Reasoning engine — the Thought → Action → Observation loop.
//!
//! Each iteration builds a prompt from the system prompt, the original query
//! and the transcript so far, calls the model, and classifies the reply:
//!
//! - **Final Answer** ends the run successfully.
//! - **Action** dispatches a tool; its output (or failure) becomes an
//!   Observation.
//! - **Thought** is recorded and the loop continues.
//! - **Invalid** output earns a corrective Observation and still costs an
//!   iteration.
//!
//! A run ends on a final answer, on `max_iterations` model round-trips, on
//! the wall-clock budget, or when a model call keeps failing after its
//! retries. Tool failures never end a run.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thoughtline_core::agent::{AgentConfig, AgentStatus, ExecutionResult, StatusDelta};
use thoughtline_core::error::{AgentError, ModelError};
use thoughtline_core::model::{CompletionRequest, ModelClient};
use thoughtline_core::permission::PermissionGate;
use thoughtline_core::tool::ToolRegistry;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatcher::ToolDispatcher;
use crate::history::{HistoryEntry, HistoryKind, HistoryLog};
use crate::parser::{Parsed, ResponseParser};
use crate::prompt::{PromptBuilder, render_turn};
use crate::status::StatusEmitter;

/// Progress once the system prompt is ready.
const PROGRESS_PROMPT_READY: f32 = 0.1;
/// Progress at the first iteration; iterations spread over the next 0.6.
const PROGRESS_LOOP_START: f32 = 0.3;
const PROGRESS_LOOP_SPAN: f32 = 0.6;
const PROGRESS_ANSWERED: f32 = 0.95;

/// Backoff never exceeds this multiple of the base delay.
const MAX_BACKOFF_FACTOR: u64 = 16;

pub struct ReasoningEngine {
    model: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    dispatcher: ToolDispatcher,
    parser: ResponseParser,
    prompt: PromptBuilder,
    config: AgentConfig,
    history: HistoryLog,
    status: StatusEmitter,
}

impl ReasoningEngine {
    /// Create an engine. Fails if `config` is out of range.
    pub fn new(
        model: Arc<dyn ModelClient>,
        tools: Arc<ToolRegistry>,
        permissions: Arc<dyn PermissionGate>,
        config: AgentConfig,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self {
            model,
            dispatcher: ToolDispatcher::new(tools.clone(), permissions),
            tools,
            parser: ResponseParser::new(config.unstructured_policy),
            prompt: PromptBuilder::new(),
            config,
            history: HistoryLog::new(),
            status: StatusEmitter::new(),
        })
    }

    /// Use a custom prompt builder (e.g. a different preamble).
    pub fn with_prompt_builder(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    /// Request `Denied` permissions once before reporting them.
    pub fn with_request_on_denied(mut self, enabled: bool) -> Self {
        self.dispatcher = self.dispatcher.with_request_on_denied(enabled);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// The rendered system prompt for the current registry.
    pub fn system_prompt(&self) -> String {
        self.prompt.build(&self.tools)
    }

    pub fn status(&self) -> &AgentStatus {
        self.status.current()
    }

    /// Subscribe observers here.
    pub fn status_mut(&mut self) -> &mut StatusEmitter {
        &mut self.status
    }

    /// The transcript of the most recent run.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.history.snapshot()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Answer `query`, driving the model and tools until a final answer.
    ///
    /// Taking `&mut self` keeps one run in flight per engine.
    pub async fn run(&mut self, query: &str) -> Result<ExecutionResult, AgentError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AgentError::InvalidConfiguration(
                "query must not be empty".into(),
            ));
        }

        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let timeout_ms = self.config.timeout_ms;
        info!(
            %run_id,
            model = self.model.name(),
            max_iterations = self.config.max_iterations,
            timeout_ms,
            "Reasoning run starting"
        );

        let budget = Duration::from_millis(timeout_ms);
        let outcome = match tokio::time::timeout(budget, self.iterate(query, run_id)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AgentError::Timeout { timeout_ms }),
        };

        let execution_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let terminal = StatusDelta::new()
            .thinking(false)
            .action(None)
            .tools(Vec::<String>::new());

        match outcome {
            Ok(final_answer) => {
                self.status.emit(terminal.step("Done").progress(1.0));
                info!(
                    %run_id,
                    total_steps = self.history.len(),
                    elapsed_ms = execution_time_ms,
                    "Reasoning run finished"
                );
                Ok(ExecutionResult {
                    success: true,
                    final_answer,
                    steps: self.history.lines(),
                    execution_time_ms,
                    total_steps: self.history.len(),
                })
            }
            Err(e) => {
                self.status.emit(terminal.step("Failed"));
                warn!(
                    %run_id,
                    error = %e,
                    total_steps = self.history.len(),
                    elapsed_ms = execution_time_ms,
                    "Reasoning run failed"
                );
                Err(e)
            }
        }
    }

    async fn iterate(&mut self, query: &str, run_id: Uuid) -> Result<String, AgentError> {
        self.history.clear();
        self.status.reset(AgentStatus {
            is_thinking: true,
            ..AgentStatus::default()
        });

        self.status.emit(StatusDelta::new().step("Building prompt"));
        let system_prompt = self.prompt.build(&self.tools);
        self.status.emit(StatusDelta::new().progress(PROGRESS_PROMPT_READY));

        let max = self.config.max_iterations;
        for iteration in 0..max {
            let progress =
                PROGRESS_LOOP_START + (iteration as f32 / max as f32) * PROGRESS_LOOP_SPAN;
            self.status.emit(
                StatusDelta::new()
                    .step(format!("Iteration {}/{max}", iteration + 1))
                    .progress(progress),
            );
            debug!(%run_id, iteration, "Reasoning iteration");

            let prompt = render_turn(&system_prompt, query, &self.history.transcript());
            let response = self.call_model(prompt, run_id, iteration).await?;

            match self.parser.classify(&response) {
                Parsed::FinalAnswer(answer) => {
                    self.history.append(HistoryKind::Thought, response.trim());
                    self.status.emit(
                        StatusDelta::new()
                            .step("Final answer")
                            .progress(PROGRESS_ANSWERED),
                    );
                    return Ok(answer);
                }
                Parsed::Action(action) => {
                    if let Some(thought) = &action.thought {
                        self.history.append(HistoryKind::Thought, thought.as_str());
                    }
                    self.history
                        .append(HistoryKind::Action, action.to_action_text());

                    self.status.emit(
                        StatusDelta::new()
                            .action(Some(format!("Using {}", action.tool)))
                            .tools([action.tool.as_str()]),
                    );
                    debug!(%run_id, iteration, tool = %action.tool, "Dispatching tool");
                    let observation = self.dispatcher.dispatch(&action).await;
                    self.status.emit(
                        StatusDelta::new()
                            .action(None)
                            .tools(Vec::<String>::new()),
                    );

                    self.history.append(HistoryKind::Observation, observation);
                }
                Parsed::ThoughtOnly(thought) => {
                    self.history.append(HistoryKind::Thought, thought);
                }
                Parsed::Invalid { reason } => {
                    debug!(%run_id, iteration, %reason, "Model output did not parse");
                    self.history
                        .append(HistoryKind::Observation, format_correction(&reason));
                }
            }

            tokio::task::yield_now().await;
        }

        Err(AgentError::MaxIterationsExceeded {
            max_iterations: max,
        })
    }

    /// One model round-trip, retried with capped exponential backoff.
    async fn call_model(
        &self,
        prompt: String,
        run_id: Uuid,
        iteration: u32,
    ) -> Result<String, AgentError> {
        let max_attempts = self.config.retry_attempts.saturating_add(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let request = CompletionRequest {
                prompt: prompt.clone(),
                system_role: self.config.system_role.clone(),
                use_context: self.config.use_context,
                temperature: self.config.temperature,
            };

            let result = if self.config.stream {
                self.stream_model(request).await
            } else {
                self.model.complete(request).await
            };

            match result {
                Ok(text) => {
                    debug!(
                        %run_id,
                        iteration,
                        attempt,
                        response_len = text.len(),
                        "Model responded"
                    );
                    return Ok(text);
                }
                Err(e) if attempt >= max_attempts => {
                    return Err(AgentError::ServiceFailure {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => {
                    let delay = retry_delay(self.config.retry_backoff_ms, attempt - 1, &e);
                    warn!(
                        %run_id,
                        iteration,
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Consume a fragment stream, forwarding each fragment to observers.
    async fn stream_model(&self, request: CompletionRequest) -> Result<String, ModelError> {
        let mut fragments = self.model.stream(request).await?;
        let mut text = String::new();
        while let Some(fragment) = fragments.recv().await {
            let fragment = fragment?;
            self.status.fragment(&fragment);
            text.push_str(&fragment);
        }
        Ok(text)
    }
}

/// Delay before retry number `retry` (zero-based).
///
/// `base × 2^retry`, capped at 16× base. A rate-limit hint from the service
/// raises the delay to at least the hinted wait.
fn retry_delay(base_ms: u64, retry: u32, error: &ModelError) -> Duration {
    let factor = 1u64
        .checked_shl(retry)
        .unwrap_or(MAX_BACKOFF_FACTOR)
        .min(MAX_BACKOFF_FACTOR);
    let mut delay_ms = base_ms.saturating_mul(factor);
    if let ModelError::RateLimited { retry_after_secs } = error {
        delay_ms = delay_ms.max(retry_after_secs.saturating_mul(1000));
    }
    Duration::from_millis(delay_ms)
}

fn format_correction(reason: &str) -> String {
    format!(
        "Invalid response format: {reason}. Reply with either \"Thought: <reasoning>\" \
         followed by \"Action: {{\"tool\": \"<tool name>\", \"args\": {{...}}}}\", \
         or \"Final Answer: <answer>\"."
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────

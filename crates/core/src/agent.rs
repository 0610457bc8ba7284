//! Agent configuration, live status, and run result types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::AgentError;

/// What to do with a response that carries no final-answer marker, no
/// action, and no labelled thought.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnstructuredPolicy {
    /// Treat it as malformed and feed back a format correction.
    #[default]
    Strict,
    /// Accept the whole response as the final answer.
    Permissive,
}

/// Per-executor limits and generation settings. Read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model round-trips per run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Wall-clock budget for one run.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts for a failed model call (tool failures are never retried).
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base delay between model retries; doubles per attempt, capped at 16x.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub unstructured_policy: UnstructuredPolicy,

    /// Consume model output as a fragment stream for live display.
    #[serde(default)]
    pub stream: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_role: Option<String>,

    #[serde(default)]
    pub use_context: bool,
}

fn default_max_iterations() -> u32 {
    8
}
fn default_timeout_ms() -> u64 {
    60_000
}
fn default_retry_attempts() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    250
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            timeout_ms: default_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            unstructured_policy: UnstructuredPolicy::default(),
            stream: false,
            system_role: None,
            use_context: false,
        }
    }
}

impl AgentConfig {
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn with_unstructured_policy(mut self, policy: UnstructuredPolicy) -> Self {
        self.unstructured_policy = policy;
        self
    }

    /// Check limits before an engine is built around this config.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.max_iterations == 0 {
            return Err(AgentError::InvalidConfiguration(
                "max_iterations must be positive".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(AgentError::InvalidConfiguration(
                "timeout_ms must be positive".into(),
            ));
        }
        if !self.temperature.is_finite() {
            return Err(AgentError::InvalidConfiguration(
                "temperature must be a finite number".into(),
            ));
        }
        Ok(())
    }
}

/// Live status of a run, as seen by observers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub is_thinking: bool,
    pub current_action: Option<String>,
    pub tools_in_use: BTreeSet<String>,
    pub step: Option<String>,
    pub progress: f32,
}

impl AgentStatus {
    /// Merge a delta. Progress is clamped to [0, 1] and never moves backwards.
    pub fn apply(&mut self, delta: &StatusDelta) {
        if let Some(thinking) = delta.is_thinking {
            self.is_thinking = thinking;
        }
        if let Some(action) = &delta.current_action {
            self.current_action = action.clone();
        }
        if let Some(tools) = &delta.tools_in_use {
            self.tools_in_use = tools.clone();
        }
        if let Some(step) = &delta.step {
            self.step = step.clone();
        }
        if let Some(progress) = delta.progress {
            self.progress = clamp_progress(progress).max(self.progress);
        }
    }
}

/// Clamp a progress value into [0, 1]; NaN maps to 0.
pub fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// A partial status update. `None` means "unchanged"; for the nullable
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_thinking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_action: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_in_use: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
}

impl StatusDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thinking(mut self, thinking: bool) -> Self {
        self.is_thinking = Some(thinking);
        self
    }

    pub fn action(mut self, action: Option<String>) -> Self {
        self.current_action = Some(action);
        self
    }

    pub fn tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools_in_use = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(Some(step.into()));
        self
    }

    pub fn progress(mut self, progress: f32) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// What a completed run hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub final_answer: String,
    /// Rendered transcript lines, in append order.
    pub steps: Vec<String>,
    #[serde(rename = "executionTime")]
    pub execution_time_ms: u64,
    pub total_steps: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.unstructured_policy, UnstructuredPolicy::Strict);
    }

    #[test]
    fn zero_limits_rejected() {
        let err = AgentConfig::default().with_max_iterations(0).validate();
        assert!(matches!(err, Err(AgentError::InvalidConfiguration(_))));
        let err = AgentConfig::default().with_timeout_ms(0).validate();
        assert!(matches!(err, Err(AgentError::InvalidConfiguration(_))));
    }

    #[test]
    fn status_apply_merges_only_present_fields() {
        let mut status = AgentStatus {
            is_thinking: true,
            step: Some("setup".into()),
            ..AgentStatus::default()
        };
        status.apply(&StatusDelta::new().action(Some("Using calc".into())).tools(["calc"]));
        assert!(status.is_thinking);
        assert_eq!(status.step.as_deref(), Some("setup"));
        assert_eq!(status.current_action.as_deref(), Some("Using calc"));
        assert!(status.tools_in_use.contains("calc"));

        status.apply(&StatusDelta::new().action(None).tools(Vec::<String>::new()));
        assert!(status.current_action.is_none());
        assert!(status.tools_in_use.is_empty());
    }

    #[test]
    fn status_progress_is_clamped_and_monotonic() {
        let mut status = AgentStatus::default();
        status.apply(&StatusDelta::new().progress(0.5));
        status.apply(&StatusDelta::new().progress(0.2));
        assert!((status.progress - 0.5).abs() < f32::EPSILON);
        status.apply(&StatusDelta::new().progress(3.0));
        assert!((status.progress - 1.0).abs() < f32::EPSILON);
        assert_eq!(clamp_progress(f32::NAN), 0.0);
    }

    #[test]
    fn execution_result_uses_camel_case_keys() {
        let result = ExecutionResult {
            success: true,
            final_answer: "42".into(),
            steps: vec!["Thought: done".into()],
            execution_time_ms: 12,
            total_steps: 1,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["finalAnswer"], "42");
        assert_eq!(json["executionTime"], 12);
        assert_eq!(json["totalSteps"], 1);
    }
}

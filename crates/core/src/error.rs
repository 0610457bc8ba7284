//! Error types for the Thoughtline domain.
//!
//! Uses `thiserror` for ergonomic error definitions. The taxonomy mirrors
//! how far each failure may travel:
//!
//! - [`AgentError`] terminates a run and reaches the caller.
//! - [`ToolError`] never leaves the dispatcher; it is rendered into an
//!   Observation so the model can react to it.
//! - [`ModelError`] is retried by the engine and only surfaces wrapped in
//!   [`AgentError::ServiceFailure`] once the retry budget is spent.

use thiserror::Error;

/// Terminal failures of a reasoning run.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Run timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Maximum iterations ({max_iterations}) exceeded without a final answer")]
    MaxIterationsExceeded { max_iterations: u32 },

    #[error("Model call failed after {attempts} attempt(s): {source}")]
    ServiceFailure {
        attempts: u32,
        #[source]
        source: ModelError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Failures of a single tool dispatch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {tool_name} requires '{permission}'")]
    PermissionDenied { tool_name: String, permission: String },

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

impl ToolError {
    /// Shorthand for an [`ToolError::ExecutionFailed`].
    pub fn failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }
}

/// Failures of the generative model collaborator.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by model service, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Model not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_iterations_error_names_limit() {
        let err = AgentError::MaxIterationsExceeded { max_iterations: 7 };
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn service_failure_carries_source() {
        let err = AgentError::ServiceFailure {
            attempts: 3,
            source: ModelError::ApiError {
                status_code: 503,
                message: "overloaded".into(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("3 attempt"));
        assert!(text.contains("503"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = ToolError::PermissionDenied {
            tool_name: "getWeather".into(),
            permission: "location".into(),
        };
        assert!(err.to_string().contains("getWeather"));
        assert!(err.to_string().contains("location"));

        let err = ToolError::failed("calculate", "missing required parameter 'expression'");
        assert!(err.to_string().contains("'expression'"));
    }
}

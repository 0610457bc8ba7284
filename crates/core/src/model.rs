//! ModelClient trait — the abstraction over the generative model call.
//!
//! The reasoning engine only ever needs "prompt in, text out". Everything
//! the model does internally (retrieval, embeddings, sampling) is the
//! implementation's business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ModelError;

/// A finite, non-restartable sequence of text fragments from a streamed
/// completion. The sender side closes when the completion is done.
pub type FragmentReceiver = mpsc::Receiver<Result<String, ModelError>>;

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The full prompt text (system prompt, query, and transcript).
    pub prompt: String,

    /// Optional role label for the system side of the exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_role: Option<String>,

    /// Whether the model may draw on its own retained context.
    #[serde(default)]
    pub use_context: bool,

    /// Sampling temperature, opaque to the engine.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.7
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_role: None,
            use_context: false,
            temperature: default_temperature(),
        }
    }
}

/// The generative model collaborator.
///
/// Implementations: the OpenAI-compatible HTTP client in
/// `thoughtline-providers`, and scripted doubles in tests.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A human-readable name (e.g. "openai", "scripted").
    fn name(&self) -> &str;

    /// Send a request and get the complete response text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError>;

    /// Send a request and get the response as a stream of text fragments.
    ///
    /// Default implementation calls `complete()` and yields the result as a
    /// single fragment.
    async fn stream(&self, request: CompletionRequest) -> Result<FragmentReceiver, ModelError> {
        let text = self.complete(request).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.send(Ok(text)).await;
        Ok(rx)
    }
}

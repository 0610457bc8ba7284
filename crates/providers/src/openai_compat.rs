//! OpenAI-compatible model client.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any
//! endpoint exposing `/v1/chat/completions`.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Model listing

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use thoughtline_core::error::ModelError;
use thoughtline_core::model::{CompletionRequest, FragmentReceiver, ModelClient};
use tracing::{debug, trace, warn};

/// A model client for OpenAI-compatible chat endpoints.
///
/// The endpoint is stateless, so `use_context` has no effect here; every
/// request carries the full transcript in its prompt.
pub struct OpenAiCompatModel {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatModel {
    /// Create a new OpenAI-compatible client.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ModelError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Create an OpenAI client (convenience constructor).
    pub fn openai(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            api_key,
            model,
            Duration::from_secs(120),
        )
    }

    /// Create an Ollama client (convenience constructor).
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Result<Self, ModelError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
            model,
            Duration::from_secs(120),
        )
    }

    /// Build the chat-completions request body.
    fn request_body(&self, request: &CompletionRequest, stream: bool) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(role) = &request.system_role {
            messages.push(serde_json::json!({ "role": "system", "content": role }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "stream": stream,
        })
    }

    async fn post(
        &self,
        body: &serde_json::Value,
        stream: bool,
    ) -> Result<reqwest::Response, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        check_status(response).await
    }

    /// List model IDs advertised by the endpoint.
    pub async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let models = body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }
}

/// Map HTTP status codes onto model errors.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ModelError> {
    let status = response.status().as_u16();

    if status == 429 {
        return Err(ModelError::RateLimited {
            retry_after_secs: 5,
        });
    }

    if status == 401 || status == 403 {
        return Err(ModelError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ));
    }

    if status != 200 {
        let error_body = response.text().await.unwrap_or_default();
        warn!(status, body = %error_body, "Model endpoint returned error");
        return Err(ModelError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    Ok(response)
}

#[async_trait]
impl ModelClient for OpenAiCompatModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError> {
        debug!(client = %self.name, model = %self.model, "Sending completion request");

        let body = self.request_body(&request, false);
        let response = self.post(&body, false).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ModelError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| ModelError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<FragmentReceiver, ModelError> {
        debug!(client = %self.name, model = %self.model, "Sending streaming request");

        let body = self.request_body(&request, true);
        let response = self.post(&body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let client_name = self.name.clone();

        // Spawn task to read the SSE byte stream and forward content fragments
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ModelError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for event in decoder.push(&String::from_utf8_lossy(&bytes)) {
                    match event {
                        SseEvent::Fragment(text) => {
                            if tx.send(Ok(text)).await.is_err() {
                                return; // receiver dropped
                            }
                        }
                        SseEvent::Done => return,
                        SseEvent::Unparseable(data) => {
                            trace!(
                                client = %client_name,
                                data = %data,
                                "Ignoring unparseable SSE chunk"
                            );
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// One decoded server-sent event.
#[derive(Debug, PartialEq)]
enum SseEvent {
    Fragment(String),
    Done,
    Unparseable(String),
}

/// Incremental line decoder for `data: ...` SSE payloads.
#[derive(Default)]
struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    /// Feed raw text; returns the events completed by it.
    fn push(&mut self, text: &str) -> Vec<SseEvent> {
        self.buffer.push_str(text);
        let mut events = Vec::new();

        while let Some(line_end) = self.buffer.find('\n') {
            let line = self.buffer[..line_end].trim_end_matches('\r').to_string();
            self.buffer.drain(..=line_end);

            // Skip empty lines and SSE comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();

            if data == "[DONE]" {
                events.push(SseEvent::Done);
                continue;
            }

            match serde_json::from_str::<StreamResponse>(data) {
                Ok(resp) => {
                    let content = resp
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta.content)
                        .filter(|c| !c.is_empty());
                    if let Some(content) = content {
                        events.push(SseEvent::Fragment(content));
                    }
                }
                Err(_) => events.push(SseEvent::Unparseable(data.to_string())),
            }
        }

        events
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

//! Shared test helpers for engine tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use thoughtline_core::error::ModelError;
use thoughtline_core::model::{CompletionRequest, FragmentReceiver, ModelClient};
use tokio::sync::mpsc;

/// A mock model that returns a sequence of scripted responses.
///
/// Each call pops the next scripted result. Once the script runs out, the
/// `repeat` response (if any) is returned forever; otherwise the call fails
/// with `ModelError::Unavailable`.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    repeat: Option<String>,
    delay: Option<Duration>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: &[&str]) -> Self {
        Self::with_results(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_results(results: Vec<Result<String, ModelError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            repeat: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Return the same text on every call.
    pub fn repeating(text: &str) -> Self {
        Self {
            repeat: Some(text.to_string()),
            ..Self::with_results(Vec::new())
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls made so far (including failed ones).
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: CompletionRequest) -> Result<String, ModelError> {
        self.requests.lock().unwrap().push(request);
        match self.script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => self
                .repeat
                .clone()
                .ok_or_else(|| ModelError::Unavailable("script exhausted".into())),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next(request)
    }

    /// Streams the scripted text word by word.
    async fn stream(&self, request: CompletionRequest) -> Result<FragmentReceiver, ModelError> {
        let text = self.complete(request).await?;
        let fragments: Vec<String> = text.split_inclusive(' ').map(str::to_string).collect();
        let (tx, rx) = mpsc::channel(fragments.len().max(1));
        for fragment in fragments {
            let _ = tx.send(Ok(fragment)).await;
        }
        Ok(rx)
    }
}

//! Shared test helpers for orchestrator and service tests.

use async_trait::async_trait;
use ragchat_core::embedding::Embedder;
use ragchat_core::error::{EmbeddingError, ProviderError};
use ragchat_core::provider::{ChunkReceiver, Provider, ProviderRequest, StreamChunk, Usage};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// One scripted event on a model stream.
#[derive(Debug, Clone)]
pub enum Step {
    Text(String),
    Error(ProviderError),
    Pause(Duration),
    Done,
}

/// A mock provider that plays back a scripted stream.
///
/// Every call to `stream` replays the same script. A script without
/// `Done` closes the channel early, like a dropped connection.
pub struct ScriptedProvider {
    script: Vec<Step>,
    refuse: Option<ProviderError>,
    echo: Option<usize>,
    open_delay: Option<Duration>,
    call_count: Mutex<usize>,
    last_request: Mutex<Option<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            refuse: None,
            echo: None,
            open_delay: None,
            call_count: Mutex::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Stream the given fragments, then finish.
    pub fn text(fragments: &[&str]) -> Self {
        let mut script: Vec<Step> = fragments.iter().map(|f| Step::Text(f.to_string())).collect();
        script.push(Step::Done);
        Self::new(script)
    }

    /// Fail to open the stream at all.
    pub fn refusing(error: ProviderError) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.refuse = Some(error);
        provider
    }

    /// Stream `{user message}-{i}` for i in 0..n, yielding between fragments.
    pub fn echo(n: usize) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.echo = Some(n);
        provider
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.last_request.lock().unwrap().clone()
    }

    fn script_for(&self, request: &ProviderRequest) -> Vec<Step> {
        match self.echo {
            Some(n) => {
                let tag = request
                    .messages
                    .last()
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                let mut steps: Vec<Step> = (0..n).map(|i| Step::Text(format!("{tag}-{i}"))).collect();
                steps.push(Step::Done);
                steps
            }
            None => self.script.clone(),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        let script = self.script_for(&request);
        *self.last_request.lock().unwrap() = Some(request);

        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.refuse {
            return Err(err.clone());
        }

        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for step in script {
                let item = match step {
                    Step::Text(t) => Ok(StreamChunk::text(t)),
                    Step::Error(e) => Err(e),
                    Step::Done => Ok(StreamChunk::finished(Some(Usage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        total_tokens: 15,
                    }))),
                    Step::Pause(d) => {
                        tokio::time::sleep(d).await;
                        continue;
                    }
                };
                if tx.send(item).await.is_err() {
                    return;
                }
                tokio::task::yield_now().await;
            }
        });
        Ok(rx)
    }
}

/// Deterministic bag-of-words embedder, optionally always failing.
pub struct HashEmbedder {
    dimension: usize,
    fail: bool,
    call_count: Mutex<usize>,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            call_count: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(4)
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        *self.call_count.lock().unwrap() += 1;
        if self.fail {
            return Err(EmbeddingError::Unavailable("embedding service down".into()));
        }
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0; self.dimension];
                for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
                    let bucket = word
                        .to_lowercase()
                        .bytes()
                        .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
                    v[bucket % self.dimension] += 1.0;
                }
                v
            })
            .collect())
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}

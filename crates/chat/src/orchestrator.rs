//! The streaming chat orchestrator.
//!
//! One request moves through `Init → Routing → Assembling → Streaming` and
//! ends in `Done` or `Failed`. [`Orchestrator::open`] covers everything up to
//! the opened model stream; [`ChatStream::relay`] pulls fragments from the
//! model and pushes each one to a [`ChunkSink`] the moment it arrives.
//!
//! A single deadline, set at `open`, bounds the whole request. The model is
//! called once per request, never retried.

use ragchat_config::{AppConfig, Placement};
use ragchat_core::message::ConversationTurn;
use ragchat_core::provider::{ChunkReceiver, Provider, ProviderRequest};
use ragchat_core::error::ProviderError;
use ragchat_rag::Retriever;
use ragchat_tools::ToolRouter;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::error::{ChatError, Phase};
use crate::prompt;
use crate::sink::{ChunkSink, SinkClosed};

/// An incoming chat message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: String,
}

impl ChatRequest {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }

    fn validate(&self) -> Result<(), ChatError> {
        if self.id.trim().is_empty() {
            return Err(ChatError::Validation("id is required".into()));
        }
        if self.content.trim().is_empty() {
            return Err(ChatError::Validation("content is required".into()));
        }
        Ok(())
    }
}

pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    router: Option<Arc<ToolRouter>>,
    retriever: Option<Arc<Retriever>>,
    system_prompt: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    placement: Placement,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            router: None,
            retriever: None,
            system_prompt: system_prompt.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            placement: Placement::Prepend,
            timeout: Duration::from_secs(30),
        }
    }

    /// Model parameters, placement, and deadline from config.
    pub fn configured(mut self, config: &AppConfig) -> Self {
        self.temperature = config.temperature;
        self.max_tokens = config.max_tokens;
        self.placement = config.rag.placement;
        self.timeout = Duration::from_secs(config.gateway.chat_timeout_secs);
        self
    }

    pub fn with_router(mut self, router: Option<Arc<ToolRouter>>) -> Self {
        self.router = router;
        self
    }

    pub fn with_retriever(mut self, retriever: Option<Arc<Retriever>>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate, route, assemble, and open the model stream.
    ///
    /// Every error here happens before any fragment has been relayed.
    pub async fn open(&self, request: ChatRequest) -> Result<ChatStream, ChatError> {
        let deadline = Instant::now() + self.timeout;
        request.validate()?;
        debug!(id = %request.id, phase = %Phase::Init, "Chat request accepted");

        // Routing
        let (content, tool_used) = match &self.router {
            Some(router) => {
                let outcome = timeout_at(deadline, router.route(&request.content))
                    .await
                    .map_err(|_| ChatError::Timeout { phase: Phase::Routing })?;
                if outcome.used {
                    info!(id = %request.id, tool = ?outcome.tool, "Message answered by tool");
                }
                (outcome.content, outcome.used)
            }
            None => (request.content.clone(), false),
        };

        // Assembling
        let hits = match &self.retriever {
            Some(retriever) if !tool_used => timeout_at(deadline, retriever.retrieve(&content, None))
                .await
                .map_err(|_| ChatError::Timeout { phase: Phase::Assembling })??,
            _ => Vec::new(),
        };
        let user = prompt::user_content(&content, &hits, self.placement);
        let turn = ConversationTurn::new(self.system_prompt.clone(), user);
        debug!(id = %request.id, references = hits.len(), tool_used, "Conversation turn assembled");

        // Streaming (open)
        let provider_request = ProviderRequest {
            model: self.model.clone(),
            messages: turn.into_messages(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let receiver = timeout_at(deadline, self.provider.stream(provider_request))
            .await
            .map_err(|_| ChatError::Timeout { phase: Phase::Streaming })??;

        info!(id = %request.id, provider = %self.provider.name(), "Model stream opened");
        Ok(ChatStream {
            id: request.id,
            receiver,
            deadline,
        })
    }
}

/// How a relay ended.
#[derive(Debug, Clone)]
pub enum StreamEnd {
    /// The model signalled completion
    Completed,
    /// The sink closed; relay stopped without error
    ClientClosed,
    /// The model stream failed or the deadline passed
    Failed(ChatError),
}

#[derive(Debug, Clone)]
pub struct RelaySummary {
    /// Fragments delivered to the sink
    pub relayed: usize,
    pub end: StreamEnd,
}

impl RelaySummary {
    pub fn is_complete(&self) -> bool {
        matches!(self.end, StreamEnd::Completed)
    }

    pub fn phase(&self) -> Phase {
        match self.end {
            StreamEnd::Completed => Phase::Done,
            StreamEnd::ClientClosed => Phase::Streaming,
            StreamEnd::Failed(_) => Phase::Failed,
        }
    }
}

/// An opened model stream for one request.
pub struct ChatStream {
    id: String,
    receiver: ChunkReceiver,
    deadline: Instant,
}

impl ChatStream {
    /// Forward fragments to `sink` in arrival order until the model finishes,
    /// the stream fails, the sink closes, or the deadline passes.
    ///
    /// Dropping the receiver on return stops the producer task.
    pub async fn relay<S>(mut self, sink: &mut S) -> RelaySummary
    where
        S: ChunkSink + ?Sized,
    {
        let mut relayed = 0;
        let end = loop {
            let next = match timeout_at(self.deadline, self.receiver.recv()).await {
                Ok(next) => next,
                Err(_) => break StreamEnd::Failed(ChatError::Timeout { phase: Phase::Streaming }),
            };

            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => break StreamEnd::Failed(ChatError::Provider(e)),
                None => {
                    break StreamEnd::Failed(ChatError::Provider(ProviderError::StreamInterrupted(
                        "model stream closed before completion".into(),
                    )));
                }
            };

            if let Some(text) = chunk.content.as_deref().filter(|t| !t.is_empty()) {
                match timeout_at(self.deadline, sink.send(text)).await {
                    Ok(Ok(())) => relayed += 1,
                    Ok(Err(SinkClosed)) => break StreamEnd::ClientClosed,
                    Err(_) => break StreamEnd::Failed(ChatError::Timeout { phase: Phase::Streaming }),
                }
            }

            if chunk.done {
                break StreamEnd::Completed;
            }
        };

        match &end {
            StreamEnd::Completed => info!(id = %self.id, relayed, "Chat stream completed"),
            StreamEnd::ClientClosed => info!(id = %self.id, relayed, "Client disconnected, relay stopped"),
            StreamEnd::Failed(e) => warn!(id = %self.id, relayed, error = %e, "Chat stream failed"),
        }
        RelaySummary { relayed, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{HashEmbedder, ScriptedProvider, Step};
    use ragchat_core::document::Document;
    use ragchat_core::message::Role;
    use ragchat_index::InMemoryIndex;
    use ragchat_rag::{Chunker, IngestionPipeline};

    fn orchestrator(provider: Arc<ScriptedProvider>) -> Orchestrator {
        Orchestrator::new(provider, "test-model", "You are helpful.")
    }

    fn sum_router() -> Option<Arc<ToolRouter>> {
        Some(Arc::new(ToolRouter::from_config(&Default::default())))
    }

    #[tokio::test]
    async fn relays_fragments_in_order() {
        let provider = Arc::new(ScriptedProvider::text(&["Hel", "lo", " world"]));
        let stream = orchestrator(provider.clone())
            .open(ChatRequest::new("1", "hi"))
            .await
            .unwrap();

        let mut sink = Vec::new();
        let summary = stream.relay(&mut sink).await;

        assert!(summary.is_complete());
        assert_eq!(summary.phase(), Phase::Done);
        assert_eq!(summary.relayed, 3);
        assert_eq!(sink, vec!["Hel", "lo", " world"]);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn turn_is_system_then_user() {
        let provider = Arc::new(ScriptedProvider::text(&["ok"]));
        orchestrator(provider.clone())
            .open(ChatRequest::new("1", "question"))
            .await
            .unwrap();

        let request = provider.last_request().unwrap();
        assert_eq!(request.model, "test-model");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, "You are helpful.");
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.messages[1].content, "question");
    }

    #[tokio::test]
    async fn empty_content_makes_no_model_call() {
        let provider = Arc::new(ScriptedProvider::text(&["never"]));
        let orch = orchestrator(provider.clone());

        for request in [ChatRequest::new("1", ""), ChatRequest::new("1", "   "), ChatRequest::new("", "hi")] {
            let err = orch.open(request).await.err().unwrap();
            assert!(err.is_validation());
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_fragments_are_skipped() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Step::Text("a".into()),
            Step::Text(String::new()),
            Step::Text("b".into()),
            Step::Done,
        ]));
        let stream = orchestrator(provider).open(ChatRequest::new("1", "hi")).await.unwrap();
        let mut sink = Vec::new();
        let summary = stream.relay(&mut sink).await;
        assert_eq!(summary.relayed, 2);
        assert_eq!(sink, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn tool_result_replaces_user_message() {
        let provider = Arc::new(ScriptedProvider::text(&["The answer is 7"]));
        orchestrator(provider.clone())
            .with_router(sum_router())
            .open(ChatRequest::new("1", "3 + 4"))
            .await
            .unwrap();

        assert_eq!(provider.last_request().unwrap().messages[1].content, "7");
    }

    #[tokio::test]
    async fn retrieved_references_are_prepended() {
        let embedder = Arc::new(HashEmbedder::new(32));
        let index = Arc::new(InMemoryIndex::new(32));
        IngestionPipeline::new(Chunker::fixed(1000, 200).unwrap(), embedder.clone(), index.clone())
            .ingest(vec![Document::new("guide.md", "ragchat streams answers over SSE")])
            .await
            .unwrap();
        let retriever = Arc::new(Retriever::new(embedder, index));

        let provider = Arc::new(ScriptedProvider::text(&["ok"]));
        orchestrator(provider.clone())
            .with_retriever(Some(retriever))
            .open(ChatRequest::new("1", "how does ragchat stream answers?"))
            .await
            .unwrap();

        let user = provider.last_request().unwrap().messages[1].content.clone();
        assert!(user.starts_with("[Retrieved Knowledge]\n[Source: guide.md] ragchat streams answers over SSE"));
        assert!(user.ends_with("how does ragchat stream answers?"));
    }

    #[tokio::test]
    async fn retrieval_is_skipped_when_tool_answers() {
        let embedder = Arc::new(HashEmbedder::new(32));
        let index = Arc::new(InMemoryIndex::new(32));
        IngestionPipeline::new(Chunker::fixed(1000, 200).unwrap(), embedder.clone(), index.clone())
            .ingest(vec![Document::new("math.md", "numbers 3 and 4")])
            .await
            .unwrap();
        let retriever = Arc::new(Retriever::new(embedder.clone(), index));

        let provider = Arc::new(ScriptedProvider::text(&["ok"]));
        let calls_before = embedder.call_count();
        orchestrator(provider.clone())
            .with_router(sum_router())
            .with_retriever(Some(retriever))
            .open(ChatRequest::new("1", "3 + 4"))
            .await
            .unwrap();

        assert_eq!(provider.last_request().unwrap().messages[1].content, "7");
        assert_eq!(embedder.call_count(), calls_before);
    }

    #[tokio::test]
    async fn retrieval_failure_fails_before_streaming() {
        let index = Arc::new(InMemoryIndex::new(4));
        IngestionPipeline::new(Chunker::fixed(100, 10).unwrap(), Arc::new(HashEmbedder::new(4)), index.clone())
            .ingest(vec![Document::new("a.md", "text")])
            .await
            .unwrap();
        let retriever = Arc::new(Retriever::new(Arc::new(HashEmbedder::failing()), index));

        let provider = Arc::new(ScriptedProvider::text(&["never"]));
        let err = orchestrator(provider.clone())
            .with_retriever(Some(retriever))
            .open(ChatRequest::new("1", "hi"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChatError::Retrieval(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn provider_open_failure_is_reported() {
        let provider = Arc::new(ScriptedProvider::refusing(ProviderError::AuthenticationFailed("bad key".into())));
        let err = orchestrator(provider).open(ChatRequest::new("1", "hi")).await.err().unwrap();
        assert!(matches!(err, ChatError::Provider(ProviderError::AuthenticationFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_before_model_opens_relays_nothing() {
        let provider = Arc::new(
            ScriptedProvider::text(&["late"]).with_open_delay(Duration::from_secs(60)),
        );
        let err = orchestrator(provider)
            .with_timeout(Duration::from_secs(30))
            .open(ChatRequest::new("1", "hi"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChatError::Timeout { phase: Phase::Streaming }));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_before_first_chunk_relays_zero() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Step::Pause(Duration::from_secs(60)),
            Step::Text("late".into()),
            Step::Done,
        ]));
        let stream = orchestrator(provider)
            .with_timeout(Duration::from_secs(30))
            .open(ChatRequest::new("1", "hi"))
            .await
            .unwrap();

        let mut sink = Vec::new();
        let summary = stream.relay(&mut sink).await;
        assert_eq!(summary.relayed, 0);
        assert!(sink.is_empty());
        assert!(matches!(summary.end, StreamEnd::Failed(ChatError::Timeout { phase: Phase::Streaming })));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_mid_stream_keeps_delivered_fragments() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Step::Text("one".into()),
            Step::Pause(Duration::from_secs(45)),
            Step::Text("two".into()),
            Step::Done,
        ]));
        let stream = orchestrator(provider)
            .with_timeout(Duration::from_secs(30))
            .open(ChatRequest::new("1", "hi"))
            .await
            .unwrap();

        let mut sink = Vec::new();
        let summary = stream.relay(&mut sink).await;
        assert_eq!(sink, vec!["one"]);
        assert_eq!(summary.phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn error_after_n_chunks_relays_exactly_n() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Step::Text("a".into()),
            Step::Text("b".into()),
            Step::Text("c".into()),
            Step::Error(ProviderError::Network("connection reset".into())),
            Step::Text("never".into()),
        ]));
        let stream = orchestrator(provider).open(ChatRequest::new("1", "hi")).await.unwrap();

        let mut sink = Vec::new();
        let summary = stream.relay(&mut sink).await;
        assert_eq!(summary.relayed, 3);
        assert_eq!(sink, vec!["a", "b", "c"]);
        assert!(!summary.is_complete());
        assert!(matches!(summary.end, StreamEnd::Failed(ChatError::Provider(ProviderError::Network(_)))));
    }

    #[tokio::test]
    async fn stream_closed_without_done_is_failure() {
        let provider = Arc::new(ScriptedProvider::new(vec![Step::Text("partial".into())]));
        let stream = orchestrator(provider).open(ChatRequest::new("1", "hi")).await.unwrap();

        let mut sink = Vec::new();
        let summary = stream.relay(&mut sink).await;
        assert_eq!(summary.relayed, 1);
        assert!(matches!(
            summary.end,
            StreamEnd::Failed(ChatError::Provider(ProviderError::StreamInterrupted(_)))
        ));
    }

    #[tokio::test]
    async fn client_disconnect_stops_quietly() {
        let provider = Arc::new(ScriptedProvider::text(&["a", "b", "c"]));
        let stream = orchestrator(provider).open(ChatRequest::new("1", "hi")).await.unwrap();

        let (mut tx, rx) = tokio::sync::mpsc::channel::<String>(4);
        drop(rx);
        let summary = stream.relay(&mut tx).await;
        assert_eq!(summary.relayed, 0);
        assert!(matches!(summary.end, StreamEnd::ClientClosed));
    }

    #[tokio::test]
    async fn concurrent_requests_keep_their_own_order() {
        let provider = Arc::new(ScriptedProvider::echo(5));
        let orch = Arc::new(orchestrator(provider.clone()));

        let run = |id: &'static str| {
            let orch = orch.clone();
            tokio::spawn(async move {
                let stream = orch.open(ChatRequest::new(id, id)).await.unwrap();
                let mut sink = Vec::new();
                let summary = stream.relay(&mut sink).await;
                assert!(summary.is_complete());
                sink
            })
        };

        let (a, b) = tokio::join!(run("alpha"), run("beta"));
        let expected = |tag: &str| (0..5).map(|i| format!("{tag}-{i}")).collect::<Vec<_>>();
        assert_eq!(a.unwrap(), expected("alpha"));
        assert_eq!(b.unwrap(), expected("beta"));
        assert_eq!(provider.call_count(), 2);
    }
}

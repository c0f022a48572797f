//! Adapts a provider's embedding endpoint to the `Embedder` trait.

use async_trait::async_trait;
use ragchat_core::embedding::Embedder;
use ragchat_core::error::EmbeddingError;
use ragchat_core::provider::{EmbeddingRequest, Provider};
use std::sync::Arc;
use tracing::debug;

/// Embeds text through `Provider::embed`, batching requests.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    batch_size: usize,
    dimension: Option<usize>,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, batch_size: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            batch_size: batch_size.max(1),
            dimension: None,
        }
    }

    /// Reject any returned vector whose length is not `dimension`.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            debug!(model = %self.model, count = batch.len(), "Embedding batch");

            let response = self
                .provider
                .embed(EmbeddingRequest {
                    model: self.model.clone(),
                    inputs: batch.to_vec(),
                })
                .await?;

            if response.embeddings.len() != batch.len() {
                return Err(EmbeddingError::Malformed(format!(
                    "sent {} texts, got {} vectors",
                    batch.len(),
                    response.embeddings.len()
                )));
            }

            for vector in &response.embeddings {
                if vector.is_empty() {
                    return Err(EmbeddingError::Malformed("empty vector".into()));
                }
                if let Some(expected) = self.dimension {
                    if vector.len() != expected {
                        return Err(EmbeddingError::Malformed(format!(
                            "expected dimension {expected}, got {}",
                            vector.len()
                        )));
                    }
                }
            }

            vectors.extend(response.embeddings);
        }

        Ok(vectors)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

//! Query-time retrieval: embed the question, ask the index for neighbours.

use ragchat_config::RagConfig;
use ragchat_core::document::RetrievedChunk;
use ragchat_core::embedding::Embedder;
use ragchat_core::error::RetrievalError;
use ragchat_core::index::IndexStore;
use std::sync::Arc;
use tracing::debug;

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn IndexStore>,
    default_top_k: usize,
    min_score: f32,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn IndexStore>) -> Self {
        Self {
            embedder,
            index,
            default_top_k: 1,
            min_score: 0.0,
        }
    }

    pub fn from_config(embedder: Arc<dyn Embedder>, index: Arc<dyn IndexStore>, config: &RagConfig) -> Self {
        Self::new(embedder, index)
            .with_top_k(config.top_k)
            .with_min_score(config.min_score)
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// Drop hits scoring below `min_score`. Zero or less disables the filter.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// The chunks nearest to `query`, best first.
    ///
    /// `top_k` falls back to the configured default. An empty index returns
    /// an empty list without calling the embedder.
    pub async fn retrieve(&self, query: &str, top_k: Option<usize>) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let top_k = top_k.unwrap_or(self.default_top_k);

        if self.index.count().await? == 0 {
            debug!("Index is empty, skipping retrieval");
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let mut hits = self.index.query(&vector, top_k).await?;
        if self.min_score > 0.0 {
            hits.retain(|h| h.score >= self.min_score);
        }

        debug!(top_k, hits = hits.len(), "Retrieved context");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::Chunker;
    use crate::ingest::IngestionPipeline;
    use crate::test_helpers::{DownEmbedder, HashEmbedder};
    use ragchat_core::document::Document;
    use ragchat_core::error::{EmbeddingError, IndexError};
    use ragchat_index::InMemoryIndex;

    const DIM: usize = 64;

    async fn seeded(embedder: Arc<HashEmbedder>) -> Arc<InMemoryIndex> {
        let index = Arc::new(InMemoryIndex::new(DIM));
        let pipeline = IngestionPipeline::new(Chunker::fixed(1000, 200).unwrap(), embedder, index.clone());
        pipeline
            .ingest(vec![
                Document::new("cats.md", "Cats purr and sleep on warm windowsills"),
                Document::new("rust.md", "Rust ownership borrowing lifetimes compiler"),
                Document::new("tea.md", "Green tea oolong brewing temperature"),
            ])
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn round_trip_finds_ingested_text() {
        let embedder = Arc::new(HashEmbedder::new(DIM));
        let index = seeded(embedder.clone()).await;
        let retriever = Retriever::new(embedder, index);

        let hits = retriever
            .retrieve("Rust ownership borrowing lifetimes compiler", None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source(), Some("rust.md"));
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn explicit_top_k_overrides_default() {
        let embedder = Arc::new(HashEmbedder::new(DIM));
        let index = seeded(embedder.clone()).await;
        let retriever = Retriever::new(embedder, index);

        assert_eq!(retriever.retrieve("tea", Some(2)).await.unwrap().len(), 2);
        assert_eq!(retriever.retrieve("tea", Some(10)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_index_returns_empty_without_embedding() {
        let embedder = Arc::new(HashEmbedder::new(DIM));
        let retriever = Retriever::new(embedder.clone(), Arc::new(InMemoryIndex::new(DIM)));
        assert!(retriever.retrieve("anything", None).await.unwrap().is_empty());
        assert_eq!(embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn zero_top_k_is_index_error() {
        let embedder = Arc::new(HashEmbedder::new(DIM));
        let index = seeded(embedder.clone()).await;
        let err = Retriever::new(embedder, index).retrieve("tea", Some(0)).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Index(IndexError::InvalidTopK)));
    }

    #[tokio::test]
    async fn embedder_failure_is_reported() {
        let index = seeded(Arc::new(HashEmbedder::new(DIM))).await;
        let err = Retriever::new(Arc::new(DownEmbedder), index)
            .retrieve("tea", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(EmbeddingError::Unavailable(_))));
    }

    #[tokio::test]
    async fn min_score_filters_weak_hits() {
        let embedder = Arc::new(HashEmbedder::new(DIM));
        let index = seeded(embedder.clone()).await;
        let retriever = Retriever::new(embedder, index).with_top_k(3).with_min_score(0.99);

        let hits = retriever.retrieve("Green tea oolong brewing temperature", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source(), Some("tea.md"));
    }
}

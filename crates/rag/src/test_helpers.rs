//! Shared test doubles for ingestion and retrieval tests.

use async_trait::async_trait;
use ragchat_core::document::{Chunk, RetrievedChunk};
use ragchat_core::embedding::Embedder;
use ragchat_core::error::{EmbeddingError, IndexError};
use ragchat_core::index::IndexStore;
use std::sync::{Arc, Mutex};

/// Deterministic bag-of-words embedder: each lowercase word is hashed into
/// one of `dimension` buckets. Texts sharing words land close together.
pub struct HashEmbedder {
    dimension: usize,
    call_count: Mutex<usize>,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            call_count: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dimension];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            v[bucket % self.dimension] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        *self.call_count.lock().unwrap() += 1;
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}

/// Embedder that always fails.
pub struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("connection refused".into()))
    }
}

/// Embedder returning vectors of the wrong width.
pub struct WrongWidthEmbedder;

#[async_trait]
impl Embedder for WrongWidthEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| vec![1.0]).collect())
    }
}

/// Wraps a real index and fails upserts for chunks from one document,
/// after writing the first chunk of the batch (a partial write).
pub struct FlakyIndex {
    inner: Arc<dyn IndexStore>,
    fail_source: String,
    fail_delete: bool,
}

impl FlakyIndex {
    pub fn new(inner: Arc<dyn IndexStore>, fail_source: &str) -> Self {
        Self {
            inner,
            fail_source: fail_source.to_string(),
            fail_delete: false,
        }
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }
}

#[async_trait]
impl IndexStore for FlakyIndex {
    fn name(&self) -> &str {
        "flaky"
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn upsert(&self, mut entries: Vec<(Chunk, Vec<f32>)>) -> Result<usize, IndexError> {
        let poisoned = entries
            .first()
            .is_some_and(|(c, _)| c.source() == Some(self.fail_source.as_str()));
        if poisoned {
            entries.truncate(1);
            self.inner.upsert(entries).await?;
            return Err(IndexError::Storage("disk full".into()));
        }
        self.inner.upsert(entries).await
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>, IndexError> {
        self.inner.query(vector, top_k).await
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, IndexError> {
        if self.fail_delete {
            return Err(IndexError::Storage("read-only".into()));
        }
        self.inner.delete(ids).await
    }

    async fn ids_for_source(&self, document_id: &str) -> Result<Vec<String>, IndexError> {
        self.inner.ids_for_source(document_id).await
    }

    async fn count(&self) -> Result<usize, IndexError> {
        self.inner.count().await
    }
}

/// Store whose next upsert fails without writing anything once armed, like
/// a backend that commits each batch in one transaction.
pub struct AtomicFailIndex {
    inner: Arc<dyn IndexStore>,
    armed: Mutex<bool>,
}

impl AtomicFailIndex {
    pub fn new(inner: Arc<dyn IndexStore>) -> Self {
        Self {
            inner,
            armed: Mutex::new(false),
        }
    }

    pub fn arm(&self) {
        *self.armed.lock().unwrap() = true;
    }
}

#[async_trait]
impl IndexStore for AtomicFailIndex {
    fn name(&self) -> &str {
        "atomic-fail"
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn upsert(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<usize, IndexError> {
        let fail = std::mem::take(&mut *self.armed.lock().unwrap());
        if fail {
            return Err(IndexError::Storage("transaction aborted".into()));
        }
        self.inner.upsert(entries).await
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>, IndexError> {
        self.inner.query(vector, top_k).await
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, IndexError> {
        self.inner.delete(ids).await
    }

    async fn ids_for_source(&self, document_id: &str) -> Result<Vec<String>, IndexError> {
        self.inner.ids_for_source(document_id).await
    }

    async fn count(&self) -> Result<usize, IndexError> {
        self.inner.count().await
    }
}

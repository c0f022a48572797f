//! Ingestion pipeline: chunk → embed → upsert, one document at a time.
//!
//! Each document is all-or-nothing from the index's point of view. When an
//! upsert fails, the document is removed outright: every id that was
//! attempted and every chunk of its earlier version are deleted, so a reader
//! sees either one complete version or nothing. Chunks left over from an
//! earlier version are pruned once a new set is written.

use crate::chunker::Chunker;
use crate::loader;
use ragchat_core::document::{Chunk, Document};
use ragchat_core::embedding::Embedder;
use ragchat_core::error::{EmbeddingError, IngestError, IngestErrorKind};
use ragchat_core::index::IndexStore;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Totals for a successful ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
}

pub struct IngestionPipeline {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn IndexStore>,
}

impl IngestionPipeline {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, index: Arc<dyn IndexStore>) -> Self {
        Self {
            chunker,
            embedder,
            index,
        }
    }

    /// Ingest documents in order, stopping at the first failure.
    /// Documents before the failing one stay committed.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport::default();
        for document in &documents {
            report.chunks += self.ingest_document(document).await?;
            report.documents += 1;
        }
        Ok(report)
    }

    /// Ingest every regular file directly inside `dir`.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport, IngestError> {
        let documents = loader::load_dir(dir).await?;
        info!(dir = %dir.display(), files = documents.len(), "Ingesting directory");
        self.ingest(documents).await
    }

    /// Ingest one document. Returns the number of chunks now indexed for it.
    pub async fn ingest_document(&self, document: &Document) -> Result<usize, IngestError> {
        let started = Instant::now();
        let fail = |kind: IngestErrorKind| IngestError::new(&document.id, kind);

        let chunks = self.chunker.split(document).map_err(|e| fail(e.into()))?;
        let vectors = self.embed(&chunks).await.map_err(|e| fail(e.into()))?;

        let previous = self
            .index
            .ids_for_source(&document.id)
            .await
            .map_err(|source| {
                fail(IngestErrorKind::Index {
                    source,
                    rolled_back: true,
                    previous_removed: false,
                })
            })?;

        let written: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        let count = chunks.len();

        if !chunks.is_empty() {
            let entries: Vec<(Chunk, Vec<f32>)> = chunks.into_iter().zip(vectors).collect();
            if let Err(source) = self.index.upsert(entries).await {
                let known: HashSet<&str> = previous.iter().map(String::as_str).collect();
                let mut doomed = previous.clone();
                doomed.extend(written.iter().filter(|id| !known.contains(id.as_str())).cloned());

                let rolled_back = self.roll_back(&document.id, &doomed).await;
                return Err(fail(IngestErrorKind::Index {
                    source,
                    rolled_back,
                    previous_removed: rolled_back && !previous.is_empty(),
                }));
            }
        }

        let fresh: HashSet<&str> = written.iter().map(String::as_str).collect();
        let stale: Vec<String> = previous
            .into_iter()
            .filter(|id| !fresh.contains(id.as_str()))
            .collect();
        if !stale.is_empty() {
            match self.index.delete(&stale).await {
                Ok(n) => debug!(document = %document.id, pruned = n, "Pruned stale chunks"),
                Err(e) => warn!(document = %document.id, error = %e, "Failed to prune stale chunks"),
            }
        }

        info!(
            document = %document.id,
            chunks = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Document ingested"
        );
        Ok(count)
    }

    async fn embed(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::Malformed(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }
        let expected = self.index.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(EmbeddingError::Malformed(format!(
                "embedding dimension {} does not match index dimension {expected}",
                bad.len()
            )));
        }
        Ok(vectors)
    }

    /// Delete every id of the document. Returns whether the cleanup succeeded.
    async fn roll_back(&self, document_id: &str, ids: &[String]) -> bool {
        match self.index.delete(ids).await {
            Ok(_) => {
                warn!(document = %document_id, chunks = ids.len(), "Upsert failed, rolled back");
                true
            }
            Err(e) => {
                warn!(document = %document_id, error = %e, "Upsert failed and rollback failed");
                false
            }
        }
    }
}

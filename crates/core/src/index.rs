//! IndexStore trait — persistent (chunk, vector) storage with
//! nearest-neighbour queries.

use async_trait::async_trait;
use crate::document::{Chunk, RetrievedChunk};
use crate::error::IndexError;

/// The core index trait. Implementations: in-memory, SQLite.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// The backend name (e.g., "memory", "sqlite").
    fn name(&self) -> &str;

    /// The vector dimension every stored embedding must have.
    fn dimension(&self) -> usize;

    /// Insert or replace chunks by id (last write wins).
    /// Every vector must match [`dimension`](Self::dimension).
    async fn upsert(&self, entries: Vec<(Chunk, Vec<f32>)>) -> std::result::Result<usize, IndexError>;

    /// The `top_k` stored chunks most similar to `vector`, best first.
    /// Returns fewer when the index holds fewer; `top_k == 0` is rejected.
    async fn query(&self, vector: &[f32], top_k: usize) -> std::result::Result<Vec<RetrievedChunk>, IndexError>;

    /// Remove chunks by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> std::result::Result<usize, IndexError>;

    /// Ids of every chunk whose `source` metadata equals `document_id`.
    async fn ids_for_source(&self, document_id: &str) -> std::result::Result<Vec<String>, IndexError>;

    /// Number of stored chunks.
    async fn count(&self) -> std::result::Result<usize, IndexError>;
}

/// Reject vectors whose length differs from the index dimension.
pub fn check_dimension(id: &str, vector: &[f32], expected: usize) -> std::result::Result<(), IndexError> {
    if vector.len() != expected {
        return Err(IndexError::DimensionMismatch {
            id: id.to_string(),
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

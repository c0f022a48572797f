//! In-memory index — the default store, also used in tests.

use async_trait::async_trait;
use ragchat_core::document::{Chunk, RetrievedChunk};
use ragchat_core::error::IndexError;
use ragchat_core::index::{check_dimension, IndexStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::vector::rank_by_similarity;

struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// A process-local index keyed by chunk id.
pub struct InMemoryIndex {
    dimension: usize,
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl IndexStore for InMemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<usize, IndexError> {
        // Validate the whole batch before touching the map
        for (chunk, vector) in &entries {
            check_dimension(&chunk.id, vector, self.dimension)?;
        }

        let count = entries.len();
        let mut map = self.entries.write().await;
        for (chunk, vector) in entries {
            map.insert(chunk.id.clone(), Entry { chunk, vector });
        }
        Ok(count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>, IndexError> {
        if top_k == 0 {
            return Err(IndexError::InvalidTopK);
        }
        check_dimension("query", vector, self.dimension)?;

        let map = self.entries.read().await;
        Ok(rank_by_similarity(
            map.values().map(|e| (&e.chunk, e.vector.as_slice())),
            vector,
            top_k,
        ))
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, IndexError> {
        let mut map = self.entries.write().await;
        Ok(ids.iter().filter(|id| map.remove(id.as_str()).is_some()).count())
    }

    async fn ids_for_source(&self, document_id: &str) -> Result<Vec<String>, IndexError> {
        let map = self.entries.read().await;
        let mut ids: Vec<String> = map
            .values()
            .filter(|e| e.chunk.source() == Some(document_id))
            .map(|e| e.chunk.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.entries.read().await.len())
    }
}

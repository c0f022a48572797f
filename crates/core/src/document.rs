//! Documents, chunks, and retrieval hits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key holding the id of the document a chunk came from.
pub const META_SOURCE: &str = "source";
/// Metadata key holding the character offset of a chunk in its document.
pub const META_OFFSET: &str = "offset";
/// Metadata key holding the chunk's position in its document's chunk list.
pub const META_CHUNK_INDEX: &str = "chunk_index";

/// A raw document submitted for ingestion.
///
/// The id is caller-supplied (a file name, for uploads). Re-ingesting a
/// document under the same id supersedes the earlier version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// A segment of a document, the unit that gets embedded and indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{document_id}#{offset}`
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Chunk {
    /// The originating document id, if recorded.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).map(String::as_str)
    }
}

/// Build the stable id for a chunk starting at `offset` in `document_id`.
pub fn chunk_id(document_id: &str, offset: usize) -> String {
    format!("{document_id}#{offset}")
}

/// A chunk returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub content: String,
    /// Cosine similarity in [-1, 1]; higher is closer.
    pub score: f32,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RetrievedChunk {
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).map(String::as_str)
    }
}

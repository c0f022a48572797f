//! Error types for the ragchat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; the top-level [`Error`]
//! wraps them all for callers that do not care which stage failed.

use thiserror::Error;

/// The top-level error type for all ragchat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model upstream ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Embedding upstream ---
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    // --- Vector index ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Tools ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Chunking ---
    #[error("Chunk error: {0}")]
    Chunk(#[from] ChunkError),

    // --- Ingestion ---
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    // --- Retrieval ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Embedding service unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed embedding response: {0}")]
    Malformed(String),
}

impl From<ProviderError> for EmbeddingError {
    fn from(err: ProviderError) -> Self {
        EmbeddingError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error("Vector dimension mismatch for {id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("Document id must not be empty")]
    EmptyDocumentId,

    #[error("Invalid chunker configuration: {0}")]
    InvalidConfig(String),
}

/// Failure while ingesting one document. Always names the document.
#[derive(Debug, Clone, Error)]
#[error("Failed to ingest '{document_id}': {kind}")]
pub struct IngestError {
    pub document_id: String,
    pub kind: IngestErrorKind,
}

impl IngestError {
    pub fn new(document_id: impl Into<String>, kind: IngestErrorKind) -> Self {
        Self {
            document_id: document_id.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum IngestErrorKind {
    #[error("could not read document: {0}")]
    Load(String),

    #[error("chunking failed: {0}")]
    Chunk(#[from] ChunkError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// `previous_removed` is set when an earlier version of the document
    /// was deleted along with the failed write.
    #[error("index write failed: {source}{}", rollback_note(.rolled_back, .previous_removed))]
    Index {
        source: IndexError,
        rolled_back: bool,
        previous_removed: bool,
    },
}

fn rollback_note(rolled_back: &bool, previous_removed: &bool) -> &'static str {
    match (*rolled_back, *previous_removed) {
        (true, true) => " (rolled back, the previously indexed version was removed)",
        (true, false) => " (partial writes rolled back)",
        (false, _) => " (rollback incomplete, partial chunks may remain)",
    }
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index query failed: {0}")]
    Index(#[from] IndexError),
}

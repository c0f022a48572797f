//! Retrieval-augmentation pipeline for ragchat.
//!
//! - [`chunker`] splits documents into overlapping windows
//! - [`loader`] reads documents from disk
//! - [`ingest`] chunks, embeds, and indexes documents one at a time
//! - [`retriever`] embeds a query and returns the nearest chunks

pub mod chunker;
pub mod ingest;
pub mod loader;
pub mod retriever;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use chunker::Chunker;
pub use ingest::{IngestReport, IngestionPipeline};
pub use retriever::Retriever;

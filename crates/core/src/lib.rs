//! # ragchat Core
//!
//! Domain types, traits, and error definitions for the ragchat backend.
//! This crate has **zero framework dependencies**: it defines the contracts
//! that the provider, index, retrieval, tool and chat crates implement against.
//!
//! ## Layout
//!
//! Every external collaborator (language model, embedding model, vector
//! index, tool) is a trait here. Implementations live in their own crates,
//! so the pipeline can be assembled from config and tested with doubles.

pub mod error;
pub mod message;
pub mod provider;
pub mod document;
pub mod embedding;
pub mod index;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ConversationTurn, Message, Role};
pub use provider::{Provider, ProviderRequest, StreamChunk};
pub use document::{Chunk, Document, RetrievedChunk};
pub use embedding::Embedder;
pub use index::IndexStore;
pub use tool::{Tool, ToolResult};

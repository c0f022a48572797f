//! Model provider implementations for ragchat.
//!
//! `OpenAiCompatProvider` speaks the OpenAI chat-completions and embeddings
//! wire format, which Volcengine Ark, OpenAI, OpenRouter and Ollama all serve.
//! `ProviderEmbedder` adapts a provider's embedding endpoint to the
//! `Embedder` trait used by ingestion and retrieval.

pub mod embedder;
pub mod openai_compat;
pub mod router;
pub mod sse;

pub use embedder::ProviderEmbedder;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_embedder, build_from_config};

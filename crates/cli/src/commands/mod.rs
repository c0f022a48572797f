//! Subcommand implementations.

pub mod ingest;
pub mod query;
pub mod route;
pub mod serve;

use ragchat_config::{AppConfig, IndexBackend};
use ragchat_core::embedding::Embedder;
use ragchat_core::index::IndexStore;
use std::path::Path;
use std::sync::Arc;

/// Load config from `path` when given, otherwise from the default location.
/// Environment overrides apply either way.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => AppConfig::load_with_env(p),
        None => AppConfig::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(config)
}

/// The embedder and index used by the offline `ingest` and `query` commands.
/// These never need the chat model.
pub async fn rag_clients(
    config: &AppConfig,
) -> Result<(Arc<dyn Embedder>, Arc<dyn IndexStore>), Box<dyn std::error::Error>> {
    if config.index.backend == IndexBackend::Memory {
        eprintln!("⚠️  index.backend = \"memory\": nothing persists after this command exits.");
        eprintln!("   Set [index] backend = \"sqlite\" to share the index with `ragchat serve`.");
    }

    let embedder = ragchat_providers::build_embedder(config)
        .map_err(|e| format!("Embedder unavailable: {e}"))?;
    let index = ragchat_chat::open_index(config)
        .await
        .map_err(|e| format!("Index store unavailable: {e}"))?;
    Ok((embedder, index))
}

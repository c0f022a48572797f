//! Builds the chat provider and embedder from configuration.

use std::sync::Arc;
use ragchat_config::AppConfig;
use ragchat_core::embedding::Embedder;
use ragchat_core::error::ProviderError;
use ragchat_core::provider::Provider;
use tracing::info;
use crate::embedder::ProviderEmbedder;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the chat-model provider named by `config.provider`.
///
/// Fails when no API key is available for a provider that needs one.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&config.provider));
    let api_key = resolve_key(&config.provider, config.api_key.as_deref())?;

    let provider = OpenAiCompatProvider::new(&config.provider, base_url, api_key)?;
    info!(
        provider = %config.provider,
        model = %config.model,
        base_url = %provider.base_url(),
        "Chat provider configured"
    );
    Ok(Arc::new(provider))
}

/// Build the embedder for ingestion and retrieval.
///
/// Uses `[embedding]` overrides when present, otherwise the chat provider's
/// endpoint and key.
pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>, ProviderError> {
    let embedding = &config.embedding;
    let base_url = embedding
        .api_url
        .clone()
        .or_else(|| config.api_url.clone())
        .unwrap_or_else(|| default_base_url(&config.provider));
    let api_key = resolve_key(
        &config.provider,
        embedding.api_key.as_deref().or(config.api_key.as_deref()),
    )?;

    let provider = Arc::new(OpenAiCompatProvider::new(
        format!("{}-embeddings", config.provider),
        base_url,
        api_key,
    )?);

    info!(model = %embedding.model, dimension = config.index.dimension, "Embedder configured");
    Ok(Arc::new(
        ProviderEmbedder::new(provider, &embedding.model, embedding.batch_size)
            .with_dimension(config.index.dimension),
    ))
}

fn resolve_key(provider: &str, key: Option<&str>) -> Result<String, ProviderError> {
    match key {
        Some(k) if !k.is_empty() => Ok(k.to_string()),
        _ if is_local(provider) => Ok(provider.to_string()),
        _ => Err(ProviderError::NotConfigured(format!(
            "no API key for provider '{provider}' (set ARK_API_KEY or RAGCHAT_API_KEY)"
        ))),
    }
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "ark" | "volcengine" => "https://ark.cn-beijing.volces.com/api/v3".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

//! Configuration loading, validation, and management for ragchat.
//!
//! Loads configuration from `~/.ragchat/config.toml` (or `$RAGCHAT_CONFIG`)
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragchat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the chat model (also used for embeddings unless overridden)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Chat model provider ("ark", "openai", "openrouter", "ollama", or a custom name)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL override for the provider's OpenAI-compatible API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Chat model
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_provider() -> String {
    "ark".into()
}
fn default_model() -> String {
    "doubao-seed-1-6-250615".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("chat", &self.chat)
            .field("embedding", &self.embedding)
            .field("index", &self.index)
            .field("rag", &self.rag)
            .field("tools", &self.tools)
            .field("gateway", &self.gateway)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// System prompt placed first in every conversation turn
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Read the system prompt from this file instead (takes precedence)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_file: Option<PathBuf>,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant. When reference material is provided, \
     answer from it and say so when it does not cover the question."
        .into()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            system_prompt_file: None,
        }
    }
}

impl ChatConfig {
    /// The effective system prompt, reading `system_prompt_file` when set.
    pub fn resolve_system_prompt(&self) -> Result<String, ConfigError> {
        match &self.system_prompt_file {
            Some(path) => std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.clone(),
                reason: e.to_string(),
            }),
            None => Ok(self.system_prompt.clone()),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model served by the provider's `/embeddings` endpoint
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Base URL override (defaults to the chat provider's)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// API key override (defaults to the chat provider's)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Max texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_model() -> String {
    "doubao-embedding-text-240715".into()
}
fn default_batch_size() -> usize {
    16
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            api_url: None,
            api_key: None,
            batch_size: default_batch_size(),
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_backend")]
    pub backend: IndexBackend,

    /// SQLite database path (defaults to `~/.ragchat/index.db`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Vector dimension of the embedding model
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_index_backend() -> IndexBackend {
    IndexBackend::Memory
}
fn default_dimension() -> usize {
    2560
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            path: None,
            dimension: default_dimension(),
        }
    }
}

impl IndexConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("index.db"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Fixed-size character windows
    Fixed,
    /// Split on `#`/`##`/`###` headings first, then window long sections
    Markdown,
}

/// Where retrieved reference material goes relative to the user's question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Prepend,
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_chunk_strategy")]
    pub strategy: ChunkStrategy,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Hits scoring below this are dropped
    #[serde(default)]
    pub min_score: f32,

    #[serde(default = "default_placement")]
    pub placement: Placement,
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_chunk_strategy() -> ChunkStrategy {
    ChunkStrategy::Fixed
}
fn default_top_k() -> usize {
    1
}
fn default_placement() -> Placement {
    Placement::Prepend
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            strategy: default_chunk_strategy(),
            top_k: default_top_k(),
            min_score: 0.0,
            placement: default_placement(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Register the built-in addition intents
    #[serde(default = "default_true")]
    pub builtin_sum: bool,

    /// HTTP tools, tried after the built-ins in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote: Vec<RemoteToolConfig>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            builtin_sum: true,
            remote: Vec::new(),
        }
    }
}

/// A tool served over HTTP, triggered by regex patterns with named groups.
///
/// ```toml
/// [[tools.remote]]
/// name = "weather"
/// url = "http://localhost:8081/weather"
/// patterns = ["(?i)weather in (?P<city>\\w+)"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteToolConfig {
    pub name: String,

    pub url: String,

    #[serde(default)]
    pub description: String,

    /// Tried in order; named capture groups become JSON arguments
    pub patterns: Vec<String>,

    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

fn default_remote_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Deadline for a whole chat request
    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_secs: u64,

    /// Deadline for a whole upload request
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// CORS origins. Empty mirrors any request origin.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    9343
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_chat_timeout() -> u64 {
    30
}
fn default_upload_timeout() -> u64 {
    120
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            chat_timeout_secs: default_chat_timeout(),
            upload_timeout_secs: default_upload_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    /// Append logs to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `$RAGCHAT_CONFIG` or `~/.ragchat/config.toml`,
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("RAGCHAT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        Self::load_with_env(&path)
    }

    /// Load from `path`, then apply environment overrides and re-validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// - `RAGCHAT_API_KEY`, `ARK_API_KEY`, `OPENAI_API_KEY` (first set wins, only if no key is configured)
    /// - `RAGCHAT_PROVIDER`
    /// - `RAGCHAT_MODEL`, `ARK_MODEL`
    /// - `RAGCHAT_EMBEDDING_MODEL`, `EMBEDDER`
    /// - `PORT` (`9343` or `:9343`)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(*k).filter(|v| !v.is_empty()));

        if self.api_key.is_none() {
            self.api_key = first(&["RAGCHAT_API_KEY", "ARK_API_KEY", "OPENAI_API_KEY"]);
        }

        if let Some(provider) = first(&["RAGCHAT_PROVIDER"]) {
            self.provider = provider;
        }

        if let Some(model) = first(&["RAGCHAT_MODEL", "ARK_MODEL"]) {
            self.model = model;
        }

        if let Some(model) = first(&["RAGCHAT_EMBEDDING_MODEL", "EMBEDDER"]) {
            self.embedding.model = model;
        }

        if let Some(port) = first(&["PORT"]) {
            self.gateway.port = parse_port(&port)?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragchat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.rag.chunk_size == 0 {
            return Err(ConfigError::ValidationError("rag.chunk_size must be > 0".into()));
        }

        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ConfigError::ValidationError(
                "rag.chunk_overlap must be smaller than rag.chunk_size".into(),
            ));
        }

        if self.rag.top_k == 0 {
            return Err(ConfigError::ValidationError("rag.top_k must be >= 1".into()));
        }

        if self.index.dimension == 0 {
            return Err(ConfigError::ValidationError("index.dimension must be > 0".into()));
        }

        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError("embedding.batch_size must be > 0".into()));
        }

        if self.gateway.chat_timeout_secs == 0 || self.gateway.upload_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "gateway timeouts must be > 0".into(),
            ));
        }

        for tool in &self.tools.remote {
            if tool.patterns.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "remote tool '{}' needs at least one pattern",
                    tool.name
                )));
            }
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            chat: ChatConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            rag: RagConfig::default(),
            tools: ToolsConfig::default(),
            gateway: GatewayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Accept both `9343` and the listen-address form `:9343`.
fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    let trimmed = raw.trim();
    let digits = trimmed.rsplit(':').next().unwrap_or(trimmed);
    digits
        .parse::<u16>()
        .map_err(|_| ConfigError::ValidationError(format!("PORT is not a valid port: {raw:?}")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

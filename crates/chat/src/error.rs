//! Chat errors and the per-request phase they occurred in.

use ragchat_config::ConfigError;
use ragchat_core::error::{ProviderError, RetrievalError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Lifecycle of one chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Routing,
    Assembling,
    Streaming,
    Done,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Routing => "routing",
            Phase::Assembling => "assembling",
            Phase::Streaming => "streaming",
            Phase::Done => "done",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Model call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Request timed out during {phase}")]
    Timeout { phase: Phase },
}

impl ChatError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ChatError::Validation(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ChatError::Timeout { .. })
    }
}

/// Failure to assemble [`Services`](crate::Services) at startup.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chat model unavailable: {0}")]
    Provider(#[from] ProviderError),
}

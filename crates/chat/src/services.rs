//! Startup wiring: every shared client, built once and handed out as `Arc`s.
//!
//! Only the chat model is mandatory. If the embedder or the index cannot be
//! built, retrieval and ingestion are switched off with a warning and chat
//! keeps working without references.

use ragchat_config::{AppConfig, IndexBackend};
use ragchat_core::embedding::Embedder;
use ragchat_core::error::IndexError;
use ragchat_core::index::IndexStore;
use ragchat_core::provider::Provider;
use ragchat_index::{InMemoryIndex, SqliteIndex};
use ragchat_rag::{Chunker, IngestionPipeline, Retriever};
use ragchat_tools::ToolRouter;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::SetupError;
use crate::orchestrator::Orchestrator;

pub struct Services {
    pub config: AppConfig,
    pub provider: Arc<dyn Provider>,
    pub router: Option<Arc<ToolRouter>>,
    pub retriever: Option<Arc<Retriever>>,
    pub ingestion: Option<Arc<IngestionPipeline>>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Services {
    /// Build everything from configuration.
    pub async fn from_config(config: &AppConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let provider = ragchat_providers::build_from_config(config)?;

        let (embedder, index) = if config.rag.enabled {
            let embedder = match ragchat_providers::build_embedder(config) {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!(error = %e, "Embedder unavailable, retrieval and upload disabled");
                    None
                }
            };
            let index = match open_index(config).await {
                Ok(i) => Some(i),
                Err(e) => {
                    warn!(error = %e, "Index store unavailable, retrieval and upload disabled");
                    None
                }
            };
            (embedder, index)
        } else {
            info!("Retrieval disabled by configuration");
            (None, None)
        };

        Self::assemble(config.clone(), provider, embedder, index)
    }

    /// Wire pre-built clients together. Retrieval needs both an embedder
    /// and an index; either one missing disables it.
    pub fn assemble(
        config: AppConfig,
        provider: Arc<dyn Provider>,
        embedder: Option<Arc<dyn Embedder>>,
        index: Option<Arc<dyn IndexStore>>,
    ) -> Result<Self, SetupError> {
        let system_prompt = config.chat.resolve_system_prompt()?;

        let router = if config.tools.enabled {
            Some(Arc::new(ToolRouter::from_config(&config.tools)))
        } else {
            info!("Tool routing disabled by configuration");
            None
        };

        let (retriever, ingestion) = match (embedder, index) {
            (Some(embedder), Some(index)) if config.rag.enabled => {
                match Chunker::from_config(&config.rag) {
                    Ok(chunker) => (
                        Some(Arc::new(Retriever::from_config(embedder.clone(), index.clone(), &config.rag))),
                        Some(Arc::new(IngestionPipeline::new(chunker, embedder, index))),
                    ),
                    Err(e) => {
                        warn!(error = %e, "Invalid chunker settings, retrieval and upload disabled");
                        (None, None)
                    }
                }
            }
            _ => (None, None),
        };

        let orchestrator = Orchestrator::new(provider.clone(), &config.model, system_prompt)
            .configured(&config)
            .with_router(router.clone())
            .with_retriever(retriever.clone());

        info!(
            provider = %provider.name(),
            model = %config.model,
            retrieval = retriever.is_some(),
            tools = router.is_some(),
            "Services ready"
        );

        Ok(Self {
            config,
            provider,
            router,
            retriever,
            ingestion,
            orchestrator: Arc::new(orchestrator),
        })
    }

    pub fn retrieval_enabled(&self) -> bool {
        self.retriever.is_some()
    }

    pub fn tools_enabled(&self) -> bool {
        self.router.is_some()
    }
}

/// Open the configured index backend.
pub async fn open_index(config: &AppConfig) -> Result<Arc<dyn IndexStore>, IndexError> {
    let dimension = config.index.dimension;
    match config.index.backend {
        IndexBackend::Memory => Ok(Arc::new(InMemoryIndex::new(dimension))),
        IndexBackend::Sqlite => {
            let path = config.index.resolved_path();
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| IndexError::Storage(format!("{}: {e}", parent.display())))?;
            }
            let index = SqliteIndex::open(&path.to_string_lossy(), dimension).await?;
            Ok(Arc::new(index))
        }
    }
}

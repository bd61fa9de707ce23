//! Application state for the RAG server

use std::sync::Arc;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::engine::QueryEngine;
use crate::error::Result;
use crate::generation::{GenerationOrchestrator, PromptAssembler};
use crate::ingestion::IngestPipeline;
use crate::providers::{
    BoundedEmbedder, EmbeddingProvider, HashingEmbedder, LlmProvider, OllamaClient,
    OllamaEmbedder, OllamaLlm,
};
use crate::retrieval::Retriever;
use crate::storage::{DocumentStore, DocumentTable, SqliteDocumentTable, TableOptions};

/// Shared application state
///
/// Built once at startup and handed to every handler. Instances are
/// independent, so tests can run several side by side.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    store: DocumentStore,
    engine: QueryEngine,
    pipeline: IngestPipeline,
}

impl AppState {
    /// Create application state from configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing RAG application state (embeddings: {:?}, metric: {})...",
            config.embeddings.provider,
            config.store.metric
        );

        let client = Arc::new(OllamaClient::new(&config.llm)?);

        let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.provider {
            EmbeddingBackend::Ollama => {
                tracing::info!("Using Ollama embeddings ({})", config.embeddings.model);
                Arc::new(OllamaEmbedder::new(Arc::clone(&client), &config.embeddings))
            }
            EmbeddingBackend::Hashing => {
                tracing::info!("Using hashing embeddings ({} dims)", config.embeddings.dimensions);
                Arc::new(HashingEmbedder::new(config.embeddings.dimensions))
            }
        };

        let options = TableOptions::new(config.store.metric, embedder.dimensions())
            .with_table_name(config.store.table_name.clone());
        let path = config.store.storage_path.clone();
        let table = tokio::task::spawn_blocking(move || SqliteDocumentTable::open(path, options))
            .await??;

        let llm: Arc<dyn LlmProvider> = Arc::new(OllamaLlm::new(client));
        match llm.health_check().await {
            Ok(true) => tracing::info!("Ollama is reachable at {}", config.llm.base_url),
            _ => tracing::warn!(
                "Ollama is not reachable at {}; queries will fail until it is",
                config.llm.base_url
            ),
        }

        Ok(Self::from_parts(config, embedder, Arc::new(table), llm))
    }

    /// Assemble state from already-built collaborators
    pub fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        table: Arc<dyn DocumentTable>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(BoundedEmbedder::new(
            embedder,
            config.embeddings.max_concurrency,
        ));
        let store = DocumentStore::new(embedder, table);

        let orchestrator = GenerationOrchestrator::new(
            llm,
            config.llm.generate_model.clone(),
            config.llm.default_params(),
        );
        let engine = QueryEngine::new(
            Retriever::new(store.clone()),
            PromptAssembler::new(&config.prompt),
            orchestrator,
        );
        let pipeline = IngestPipeline::new(store.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                engine,
                pipeline,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the document store
    pub fn store(&self) -> &DocumentStore {
        &self.inner.store
    }

    /// Get the query engine
    pub fn engine(&self) -> &QueryEngine {
        &self.inner.engine
    }

    /// Get the ingestion pipeline
    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    /// Check if the store answers
    pub async fn is_ready(&self) -> bool {
        self.inner.store.health_check().await.unwrap_or(false)
    }
}

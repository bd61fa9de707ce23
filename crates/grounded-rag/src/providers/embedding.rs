//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::{Error, Result};

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OllamaEmbedder`: Local Ollama server (nomic-embed-text)
/// - `HashingEmbedder`: Deterministic feature hashing, no model required
/// - `BoundedEmbedder`: Concurrency limit over any other provider
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get embedding dimensions (e.g., 768 for nomic-embed-text)
    fn dimensions(&self) -> usize;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Caps the number of in-flight embedding calls
///
/// Ingestion and queries share one instance. Permits are handed out in
/// FIFO order so neither side starves the other.
pub struct BoundedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    permits: Semaphore,
    limit: usize,
}

impl BoundedEmbedder {
    /// Wrap `inner`, allowing at most `limit` concurrent calls
    pub fn new(inner: Arc<dyn EmbeddingProvider>, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            inner,
            permits: Semaphore::new(limit),
            limit,
        }
    }

    /// Configured concurrency limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently in use
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl EmbeddingProvider for BoundedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::internal("Embedding limiter closed"))?;
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

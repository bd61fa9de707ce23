//! Document store facade: embed on ingest, validate, delegate to the table

use std::sync::Arc;

use super::{DistanceMetric, DocumentTable};
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Document, DocumentId, DocumentMetadata, RetrievedMatch};

/// Owns persisted documents and their embeddings
#[derive(Clone)]
pub struct DocumentStore {
    embedder: Arc<dyn EmbeddingProvider>,
    table: Arc<dyn DocumentTable>,
}

impl DocumentStore {
    /// Create a store over a table, embedding with `embedder`
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, table: Arc<dyn DocumentTable>) -> Self {
        if embedder.dimensions() != table.dimension() {
            tracing::warn!(
                "Embedder '{}' produces {} dimensions but table '{}' stores {}",
                embedder.name(),
                embedder.dimensions(),
                table.name(),
                table.dimension()
            );
        }
        Self { embedder, table }
    }

    /// Embed and persist a document
    pub async fn ingest(&self, content: &str, metadata: DocumentMetadata) -> Result<DocumentId> {
        if content.trim().is_empty() {
            return Err(Error::validation(format!(
                "Document '{}' has no text content",
                metadata.src
            )));
        }
        if metadata.src.trim().is_empty() {
            return Err(Error::validation("metadata 'src' must not be empty"));
        }

        let embedding = self.embedder.embed(content).await?;
        if embedding.len() != self.table.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.table.dimension(),
                actual: embedding.len(),
            });
        }

        let document = Document::new(content.to_string(), metadata, embedding);
        let id = document.id.clone();
        let name = document.name.clone();
        self.table.insert(document).await?;

        tracing::info!("Ingested '{}' as {} ({} chars)", name, id, content.len());
        Ok(id)
    }

    /// Rank stored documents against a query vector
    pub async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<RetrievedMatch>> {
        self.table.search(query_vector, k).await
    }

    /// Delete every document with this name. False if none matched.
    pub async fn delete(&self, document_name: &str) -> Result<bool> {
        let removed = self.table.delete_by_name(document_name).await?;
        if removed > 0 {
            tracing::info!("Deleted {} row(s) named '{}'", removed, document_name);
        }
        Ok(removed > 0)
    }

    /// Patch one metadata key on every document with this name. False if none matched.
    pub async fn update_metadata(&self, document_name: &str, key: &str, value: &str) -> Result<bool> {
        let updated = self.table.update_metadata(document_name, key, value).await?;
        tracing::debug!("Updated '{}' on {} row(s) named '{}'", key, updated, document_name);
        Ok(updated > 0)
    }

    /// Point lookup by name
    pub async fn get(&self, document_name: &str) -> Result<Vec<Document>> {
        self.table.get_by_name(document_name).await
    }

    /// Number of stored documents
    pub async fn len(&self) -> Result<usize> {
        self.table.len().await
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> Result<bool> {
        self.table.is_empty().await
    }

    /// Embedding dimension of the table
    pub fn dimension(&self) -> usize {
        self.table.dimension()
    }

    /// Ranking metric of the table
    pub fn metric(&self) -> DistanceMetric {
        self.table.metric()
    }

    /// Embedder used for documents and queries
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Check if the backing table answers
    pub async fn health_check(&self) -> Result<bool> {
        self.table.health_check().await
    }
}

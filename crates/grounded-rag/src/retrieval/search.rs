//! Query-time retrieval: embed the question, rank stored documents

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::storage::DocumentStore;
use crate::types::RetrievedMatch;

/// Produces ranked context documents for a question
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: DocumentStore,
}

impl Retriever {
    /// Retrieve with the store's own embedder
    pub fn new(store: DocumentStore) -> Self {
        let embedder = store.embedder().clone();
        Self { embedder, store }
    }

    /// Retrieve with a separate query embedder
    pub fn with_embedder(store: DocumentStore, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, store }
    }

    /// Top `k` documents for `query_text`, best first
    pub async fn retrieve(&self, query_text: &str, k: usize) -> Result<Vec<RetrievedMatch>> {
        let query_vector = self.embedder.embed(query_text).await?;

        let expected = self.store.dimension();
        if query_vector.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: query_vector.len(),
            });
        }

        let matches = self.store.search(&query_vector, k).await?;

        tracing::debug!("Retrieval for '{}' ranked by {}", query_text, self.store.metric());
        match matches.first() {
            Some(top) => tracing::info!(
                "Retrieved {} documents (top: '{}', score {:.4})",
                matches.len(),
                top.name,
                top.score
            ),
            None => tracing::info!("Retrieved 0 documents"),
        }

        Ok(matches)
    }

    /// The store being searched
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashingEmbedder;
    use crate::storage::{DistanceMetric, SqliteDocumentTable, TableOptions};
    use crate::types::DocumentMetadata;

    fn store(dimension: usize) -> DocumentStore {
        let table =
            SqliteDocumentTable::in_memory(TableOptions::new(DistanceMetric::Cosine, dimension))
                .unwrap();
        DocumentStore::new(Arc::new(HashingEmbedder::new(dimension)), Arc::new(table))
    }

    #[tokio::test]
    async fn test_retrieve_ranks_relevant_first() {
        let store = store(128);
        store.ingest("Paris is the capital of France.", DocumentMetadata::new("geo.txt")).await.unwrap();
        store.ingest("Cargo builds Rust crates.", DocumentMetadata::new("rust.txt")).await.unwrap();

        let retriever = Retriever::new(store);
        let matches = retriever.retrieve("What is the capital of France?", 3).await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].metadata.src, "geo.txt");
    }

    #[tokio::test]
    async fn test_retrieve_on_empty_store() {
        let retriever = Retriever::new(store(32));
        assert!(retriever.retrieve("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let retriever = Retriever::with_embedder(store(32), Arc::new(HashingEmbedder::new(16)));
        let err = retriever.retrieve("anything", 3).await.unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch { expected: 32, actual: 16 }
        ));
    }
}

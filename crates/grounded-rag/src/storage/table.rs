//! Document table backend trait

use async_trait::async_trait;

use super::DistanceMetric;
use crate::error::Result;
use crate::types::{Document, RetrievedMatch};

/// Durable table of documents with k-nearest-neighbor search
///
/// Implementations:
/// - `SqliteDocumentTable`: rusqlite file or in-memory database
#[async_trait]
pub trait DocumentTable: Send + Sync {
    /// Persist a document. Visible to searches once this returns.
    async fn insert(&self, document: Document) -> Result<()>;

    /// Rank stored documents against `query` and keep the best `k`
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedMatch>>;

    /// Remove every row with this name, returning how many were removed
    async fn delete_by_name(&self, name: &str) -> Result<usize>;

    /// Patch one metadata key on every row with this name
    async fn update_metadata(&self, name: &str, key: &str, value: &str) -> Result<usize>;

    /// All rows with this name
    async fn get_by_name(&self, name: &str) -> Result<Vec<Document>>;

    /// Number of stored documents
    async fn len(&self) -> Result<usize>;

    /// Check if the table is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Embedding dimension fixed for this table
    fn dimension(&self) -> usize;

    /// Ranking metric fixed for this table
    fn metric(&self) -> DistanceMetric;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

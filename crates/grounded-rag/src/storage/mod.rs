//! Storage module for documents and their embeddings
//!
//! Provides the `DocumentTable` backend seam, its SQLite implementation,
//! ranking metrics, and the `DocumentStore` facade.

mod database;
mod metric;
mod store;
mod table;

pub use database::{validate_table_name, SqliteDocumentTable, TableOptions};
pub use metric::{cosine_similarity, euclidean_distance, DistanceMetric};
pub use store::DocumentStore;
pub use table::DocumentTable;

//! grounded-rag: Retrieval-augmented question answering with streamed, cited answers
//!
//! Documents are embedded and stored in SQLite. A question is embedded, the
//! closest documents are ranked by a per-store metric, rendered into a prompt,
//! and the generated answer is returned whole or streamed with a trailing
//! citation block.

pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use engine::{QueryEngine, CONTEXT_WINDOW};
pub use error::{Error, Result};
pub use generation::{AnswerStream, Fragment, StreamEvent};
pub use storage::{DistanceMetric, DocumentStore};
pub use types::{
    document::{Document, DocumentMetadata, RetrievedMatch, SourceFormat},
    query::{GenerationParams, Query, QueryRequest},
    response::{Answer, RespondResponse},
};

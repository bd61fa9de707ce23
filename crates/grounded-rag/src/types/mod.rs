//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Document, DocumentId, DocumentMetadata, RetrievedMatch, SourceFormat};
pub use query::{DocNameParams, GenerationParams, MetadataPatch, Query, QueryRequest};
pub use response::{Answer, IngestReport, RespondResponse};

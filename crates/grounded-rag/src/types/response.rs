//! Response types for the HTTP API

use serde::{Deserialize, Serialize};

use super::document::{Document, DocumentId, DocumentMetadata};

/// Body returned by `/respond`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RespondResponse {
    /// Generated answer
    pub body: String,
    /// Citation block
    pub context: String,
}

impl From<Answer> for RespondResponse {
    fn from(answer: Answer) -> Self {
        Self {
            body: answer.text,
            context: answer.citations,
        }
    }
}

/// A complete generated answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// Generated text
    pub text: String,
    /// Citation block for the documents used
    pub citations: String,
}

/// A stored document as exposed over HTTP (embedding omitted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentView {
    /// Document ID
    pub id: DocumentId,
    /// Document name
    pub name: String,
    /// Text content
    pub content: String,
    /// Provenance metadata
    pub metadata: DocumentMetadata,
    /// Embedding length
    pub dimensions: usize,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Document> for DocumentView {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            content: doc.content.clone(),
            metadata: doc.metadata.clone(),
            dimensions: doc.embedding.len(),
            ingested_at: doc.ingested_at,
        }
    }
}

/// Body returned by `/get_document`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLookupResponse {
    /// Requested name
    pub name: String,
    /// All rows stored under that name
    pub documents: Vec<DocumentView>,
}

/// One successfully ingested file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestedDocument {
    /// Assigned document ID
    pub id: DocumentId,
    /// Document name
    pub name: String,
}

/// One file skipped during a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedFile {
    /// Uploaded filename
    pub filename: String,
    /// Why it was skipped
    pub reason: String,
}

/// Body returned by `/upload_file`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestReport {
    /// Ingested documents
    pub documents: Vec<IngestedDocument>,
    /// Skipped files
    pub skipped: Vec<SkippedFile>,
}

/// Body returned by `/delete_document`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Always true on 200
    pub deleted: bool,
    /// Deleted name
    pub doc_name: String,
}

/// Body returned by `/update_document`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResponse {
    /// Always true on 200
    pub updated: bool,
    /// Updated name
    pub doc_name: String,
}

//! Document types with provenance metadata for citations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Opaque unique document identifier
pub type DocumentId = String;

/// Supported source formats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Plain text file
    Txt,
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// HTML document
    Html,
}

impl SourceFormat {
    /// Detect source format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "text" => Some(Self::Txt),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    /// Detect source format from a filename
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance metadata attached to every document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Provenance locator (file name, path or URL)
    pub src: String,
    /// Source format
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceFormat>,
    /// Extension fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl DocumentMetadata {
    /// Metadata with only a provenance locator
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            source_type: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the source format
    pub fn with_type(mut self, source_type: SourceFormat) -> Self {
        self.source_type = Some(source_type);
        self
    }

    /// Add an extension field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Patch a single key. `src` and `type` map onto the typed fields.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "src" => {
                if value.trim().is_empty() {
                    return Err(Error::validation("metadata 'src' must not be empty"));
                }
                self.src = value.to_string();
            }
            "type" => {
                let format = SourceFormat::from_extension(value).ok_or_else(|| {
                    Error::validation(format!("unknown source type '{}'", value))
                })?;
                self.source_type = Some(format);
            }
            "" => return Err(Error::validation("metadata key must not be empty")),
            other => {
                self.extra.insert(other.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Line used in the citation trailer
    pub fn provenance(&self) -> &str {
        &self.src
    }
}

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Unique document ID
    pub id: DocumentId,
    /// Human-assigned name used for lookup, update and deletion
    pub name: String,
    /// Text content
    pub content: String,
    /// Provenance metadata
    pub metadata: DocumentMetadata,
    /// Embedding vector, fixed dimension per store
    pub embedding: Vec<f32>,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document with a fresh id. The name is taken from `metadata.src`.
    pub fn new(content: String, metadata: DocumentMetadata, embedding: Vec<f32>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: metadata.src.clone(),
            content,
            metadata,
            embedding,
            ingested_at: chrono::Utc::now(),
        }
    }

    /// Read-only copy handed out by search
    pub fn to_match(&self, score: f32) -> RetrievedMatch {
        RetrievedMatch {
            id: self.id.clone(),
            name: self.name.clone(),
            text: self.content.clone(),
            metadata: self.metadata.clone(),
            embedding: self.embedding.clone(),
            score,
        }
    }
}

/// Encode an embedding as little-endian f32 bytes
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes into an embedding
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::store(format!(
            "Corrupt embedding blob of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Encode metadata as JSON text
pub fn encode_metadata(metadata: &DocumentMetadata) -> Result<String> {
    Ok(serde_json::to_string(metadata)?)
}

/// Decode metadata from JSON text
pub fn decode_metadata(raw: &str) -> Result<DocumentMetadata> {
    serde_json::from_str(raw)
        .map_err(|e| Error::store(format!("Corrupt metadata '{}': {}", raw, e)))
}

/// A search hit. Score semantics follow the store's metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedMatch {
    /// Document ID
    pub id: DocumentId,
    /// Document name
    pub name: String,
    /// Document text
    pub text: String,
    /// Provenance metadata
    pub metadata: DocumentMetadata,
    /// Stored embedding
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// Similarity (cosine) or distance (euclidean)
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_wire_format() {
        let meta = DocumentMetadata::new("geo.txt")
            .with_type(SourceFormat::Txt)
            .with_field("lang", "en");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"src": "geo.txt", "type": "txt", "lang": "en"})
        );

        let back: DocumentMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_metadata_set() {
        let mut meta = DocumentMetadata::new("a.txt");
        meta.set("type", "HTML").unwrap();
        meta.set("author", "kim").unwrap();
        meta.set("src", "b.txt").unwrap();

        assert_eq!(meta.source_type, Some(SourceFormat::Html));
        assert_eq!(meta.extra.get("author").map(String::as_str), Some("kim"));
        assert_eq!(meta.src, "b.txt");

        assert!(meta.set("type", "exe").is_err());
        assert!(meta.set("src", "  ").is_err());
    }

    #[test]
    fn test_embedding_blob() {
        let embedding = vec![0.5, -1.25, 3.0e-7, f32::MAX];
        let bytes = encode_embedding(&embedding);
        assert_eq!(bytes.len(), 16);
        assert_eq!(decode_embedding(&bytes).unwrap(), embedding);
        assert!(decode_embedding(&bytes[..5]).is_err());
    }

    #[test]
    fn test_name_comes_from_src() {
        let doc = Document::new(
            "text".to_string(),
            DocumentMetadata::new("report.pdf"),
            vec![1.0],
        );
        assert_eq!(doc.name, "report.pdf");
        assert!(uuid::Uuid::parse_str(&doc.id).is_ok());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(SourceFormat::from_filename("a.HTM"), Some(SourceFormat::Html));
        assert_eq!(SourceFormat::from_filename("notes.txt"), Some(SourceFormat::Txt));
        assert_eq!(SourceFormat::from_filename("archive.zip"), None);
        assert_eq!(SourceFormat::from_filename("README"), None);
    }
}

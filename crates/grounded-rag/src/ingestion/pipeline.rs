//! Ingestion of uploaded files and files on disk

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::parser::extract;
use crate::error::{Error, Result};
use crate::storage::DocumentStore;
use crate::types::response::{IngestReport, IngestedDocument, SkippedFile};
use crate::types::DocumentMetadata;

/// A file received for ingestion
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name used as provenance and document name
    pub filename: String,
    /// Raw bytes
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Create an uploaded file
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }
}

/// Extracts text and stores it as documents
#[derive(Clone)]
pub struct IngestPipeline {
    store: DocumentStore,
}

impl IngestPipeline {
    /// Create a pipeline writing into `store`
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// Ingest one file. Any failure is returned.
    pub async fn ingest_file(&self, file: UploadedFile) -> Result<IngestedDocument> {
        let UploadedFile { filename, data } = file;

        let extracted = {
            let filename = filename.clone();
            tokio::task::spawn_blocking(move || extract(&filename, &data)).await??
        };

        if extracted.content.trim().is_empty() {
            return Err(Error::validation(format!(
                "No text content could be extracted from '{}'",
                filename
            )));
        }

        let metadata = DocumentMetadata::new(filename.as_str()).with_type(extracted.format);
        let id = self.store.ingest(&extracted.content, metadata).await?;

        Ok(IngestedDocument { id, name: filename })
    }

    /// Ingest several files, skipping ones that cannot be read as text
    ///
    /// Unsupported formats, extraction failures and empty files are reported
    /// as skipped. Embedding and store failures abort the batch.
    pub async fn ingest_batch(&self, files: Vec<UploadedFile>) -> Result<IngestReport> {
        let total = files.len();
        let mut report = IngestReport::default();

        for file in files {
            let filename = file.filename.clone();
            match self.ingest_file(file).await {
                Ok(doc) => report.documents.push(doc),
                Err(e) if e.is_skippable() => {
                    tracing::warn!("Skipping {}: {}", filename, e);
                    report.skipped.push(SkippedFile {
                        filename,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::error!("Batch ingestion aborted at {}: {}", filename, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Batch ingestion: {}/{} files ingested, {} skipped",
            report.documents.len(),
            total,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Ingest files and directory trees from disk as one batch
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        let mut files = Vec::new();
        for path in collect_files(paths)? {
            let data = tokio::fs::read(&path).await?;
            files.push(UploadedFile::new(path.display().to_string(), data));
        }
        self.ingest_batch(files).await
    }
}

/// Expand directories into the regular files below them, skipping hidden entries
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in paths {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        if !root.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", root.display()),
            )));
        }

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        {
            let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashingEmbedder;
    use crate::storage::{DistanceMetric, SqliteDocumentTable, TableOptions};
    use std::sync::Arc;

    fn pipeline() -> IngestPipeline {
        let table =
            SqliteDocumentTable::in_memory(TableOptions::new(DistanceMetric::Cosine, 64)).unwrap();
        IngestPipeline::new(DocumentStore::new(
            Arc::new(HashingEmbedder::new(64)),
            Arc::new(table),
        ))
    }

    #[tokio::test]
    async fn test_single_file_errors_are_fatal() {
        let pipeline = pipeline();
        let err = pipeline
            .ingest_file(UploadedFile::new("blank.txt", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = pipeline
            .ingest_file(UploadedFile::new("slides.pptx", vec![0u8; 4]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[tokio::test]
    async fn test_batch_skips_and_continues() {
        let pipeline = pipeline();
        let report = pipeline
            .ingest_batch(vec![
                UploadedFile::new("geo.txt", "Paris is the capital of France."),
                UploadedFile::new("empty.txt", ""),
                UploadedFile::new("broken.pdf", "garbage"),
                UploadedFile::new("image.png", vec![0x89, 0x50]),
                UploadedFile::new("page.html", "<body><p>Rome is in Italy.</p></body>"),
            ])
            .await
            .unwrap();

        let names: Vec<_> = report.documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["geo.txt", "page.html"]);
        let skipped: Vec<_> = report.skipped.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(skipped, vec!["empty.txt", "broken.pdf", "image.png"]);

        let stored = pipeline.store.get("page.html").await.unwrap();
        assert_eq!(stored[0].metadata.source_type, Some(crate::types::SourceFormat::Html));
    }

    #[tokio::test]
    async fn test_ingest_paths_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha document").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("b.txt"), "beta document").unwrap();
        std::fs::write(dir.path().join(".hidden.txt"), "secret").unwrap();
        std::fs::write(dir.path().join("notes.md"), "# skipped").unwrap();

        let pipeline = pipeline();
        let report = pipeline.ingest_paths(&[dir.path().to_path_buf()]).await.unwrap();

        assert_eq!(report.documents.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.documents.iter().all(|d| d.name.ends_with(".txt")));
        assert_eq!(pipeline.store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ingest_paths_missing_root() {
        let err = pipeline()
            .ingest_paths(&[PathBuf::from("/definitely/not/here")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::ingestion::UploadedFile;
use crate::server::state::AppState;
use crate::types::IngestReport;

/// POST /upload_file - Upload one or more files
///
/// A single file must ingest cleanly. With several files, ones that cannot
/// be read as text are skipped and reported.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestReport>> {
    let start = Instant::now();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            tracing::debug!("Ignoring non-file field {:?}", field.name());
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::validation(format!("Failed to read {}: {}", filename, e)))?;

        tracing::info!("Received file: {} ({} bytes)", filename, data.len());
        files.push(UploadedFile::new(filename, data.to_vec()));
    }

    let report = match files.len() {
        0 => return Err(Error::validation("No files uploaded")),
        1 => {
            let file = files.remove(0);
            let document = state.pipeline().ingest_file(file).await?;
            IngestReport {
                documents: vec![document],
                skipped: Vec::new(),
            }
        }
        _ => state.pipeline().ingest_batch(files).await?,
    };

    tracing::info!(
        "Upload finished in {}ms: {} ingested, {} skipped",
        start.elapsed().as_millis(),
        report.documents.len(),
        report.skipped.len()
    );
    Ok(Json(report))
}

//! API routes for the RAG server

pub mod documents;
pub mod ingest;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Query
        .route("/respond", post(query::respond))
        .route("/respond_stream", post(query::respond_stream))
        // Ingestion - with larger body limit for file uploads
        .route(
            "/upload_file",
            post(ingest::upload_file).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Document management
        .route("/get_document", get(documents::get_document))
        .route("/delete_document", delete(documents::delete_document))
        .route("/update_document", patch(documents::update_document))
}

//! Document management endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::response::{DeleteResponse, DocumentLookupResponse, DocumentView, UpdateResponse};
use crate::types::{DocNameParams, MetadataPatch};

/// GET /get_document?doc_name= - All rows stored under a name
pub async fn get_document(
    State(state): State<AppState>,
    Query(params): Query<DocNameParams>,
) -> Result<Json<DocumentLookupResponse>> {
    let documents = state.store().get(&params.doc_name).await?;
    if documents.is_empty() {
        return Err(Error::DocumentNotFound(params.doc_name));
    }

    Ok(Json(DocumentLookupResponse {
        name: params.doc_name,
        documents: documents.iter().map(DocumentView::from).collect(),
    }))
}

/// DELETE /delete_document?doc_name= - Remove every row with a name
pub async fn delete_document(
    State(state): State<AppState>,
    Query(params): Query<DocNameParams>,
) -> Result<Json<DeleteResponse>> {
    if !state.store().delete(&params.doc_name).await? {
        return Err(Error::DocumentNotFound(params.doc_name));
    }

    Ok(Json(DeleteResponse {
        deleted: true,
        doc_name: params.doc_name,
    }))
}

/// PATCH /update_document?doc_name= - Set one metadata key
pub async fn update_document(
    State(state): State<AppState>,
    Query(params): Query<DocNameParams>,
    Json(patch): Json<MetadataPatch>,
) -> Result<Json<UpdateResponse>> {
    let updated = state
        .store()
        .update_metadata(&params.doc_name, &patch.key, &patch.value)
        .await?;
    if !updated {
        return Err(Error::DocumentNotFound(params.doc_name));
    }

    Ok(Json(UpdateResponse {
        updated: true,
        doc_name: params.doc_name,
    }))
}

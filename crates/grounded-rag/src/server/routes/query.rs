//! Query endpoints

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{Query, QueryRequest, RespondResponse};

/// POST /respond - Answer a question with citations
pub async fn respond(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<RespondResponse>> {
    let query = Query::from(request);
    tracing::info!("Query: {}", query.text);

    let answer = state.engine().answer(&query).await?;
    Ok(Json(RespondResponse::from(answer)))
}

/// POST /respond_stream - Stream the answer, then the citation block
///
/// Failures before the first fragment are returned as JSON errors. Later
/// failures abort the chunked body.
pub async fn respond_stream(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Response> {
    let query = Query::from(request);
    tracing::info!("Streaming query: {}", query.text);

    let stream = state.engine().answer_stream(&query).await?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream.into_byte_stream()),
    )
        .into_response())
}

//! Document Routes
//!
//! Raw key/value documents, the server-side counterpart of the browser's
//! `localStorage`. Bodies are opaque text.
//!
//! - GET /api/v1/documents - List keys
//! - GET /api/v1/documents/:key - Read a document
//! - PUT /api/v1/documents/:key - Write a document (last write wins)
//! - DELETE /api/v1/documents/:key - Remove a document

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /api/v1/documents
pub async fn list_documents(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.store.document_keys().await)
}

/// GET /api/v1/documents/:key
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let value = state
        .store
        .get_document(&key)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Document '{}' not found", key)))?;

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], value))
}

/// PUT /api/v1/documents/:key
pub async fn put_document(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    body: String,
) -> ApiResult<StatusCode> {
    state.store.set_document(&key, body).await?;
    tracing::debug!(key = %key, "Document stored");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/documents/:key
///
/// Removing a missing key is not an error.
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.remove_document(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

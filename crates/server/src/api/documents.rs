// Document endpoints.
//
// Routes:
//   GET    /api/docs        list (seeds an empty store)
//   POST   /api/docs        create
//   GET    /api/docs/{id}   get single
//   PATCH  /api/docs/{id}   partial update
//
// Request bodies are parsed leniently: malformed JSON counts as `{}` and
// non-string `title`/`content` values are dropped.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use quire_common::protocol::{
    DataEnvelope, CREATE_FAILED_MESSAGE, DOCS_PATH, LOAD_FAILED_MESSAGE, UPDATE_FAILED_MESSAGE,
};
use quire_common::types::{Document, DocumentPatch};

use super::ApiState;
use crate::error::ApiError;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(DOCS_PATH, get(list_documents).post(create_document))
        .route(&format!("{DOCS_PATH}/{{id}}"), get(get_document).patch(update_document))
        .with_state(state)
}

async fn list_documents(
    State(state): State<ApiState>,
) -> Result<Json<DataEnvelope<Vec<Document>>>, ApiError> {
    let documents =
        state.store.list().await.map_err(|error| ApiError::internal(LOAD_FAILED_MESSAGE, error))?;
    Ok(Json(DataEnvelope::new(documents)))
}

async fn create_document(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<(StatusCode, Json<DataEnvelope<Document>>), ApiError> {
    let patch = DocumentPatch::from_body(&body);
    let document = state
        .store
        .create(patch)
        .await
        .map_err(|error| ApiError::internal(CREATE_FAILED_MESSAGE, error))?;

    Ok((StatusCode::CREATED, Json(DataEnvelope::new(document))))
}

async fn get_document(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<DataEnvelope<Document>>, ApiError> {
    let document = state
        .store
        .get(id)
        .await
        .map_err(|error| ApiError::internal(LOAD_FAILED_MESSAGE, error))?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(DataEnvelope::new(document)))
}

async fn update_document(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<DataEnvelope<Document>>, ApiError> {
    let patch = DocumentPatch::from_body(&body);
    if patch.is_empty() {
        return Err(ApiError::NoFields);
    }

    let document = state
        .store
        .update(id, patch)
        .await
        .map_err(|error| ApiError::internal(UPDATE_FAILED_MESSAGE, error))?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(DataEnvelope::new(document)))
}

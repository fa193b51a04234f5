//! API endpoints for memory records.

use std::path::PathBuf;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::asset::{content_type_for_path, LocalAsset};
use crate::error::Error;
use crate::record::{MemoryDraft, MemoryPatch, MemoryRecord};
use crate::web::server::AppState;

/// Memory API response.
#[derive(Serialize)]
pub struct MemoryResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub created_at: i64,
}

impl From<MemoryRecord> for MemoryResponse {
    fn from(record: MemoryRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            image_url: record.image_url,
            created_at: record.created_at,
        }
    }
}

/// Create memory request. `image_path` must be readable by the server
/// process; the bytes are uploaded to the blob store, not served from disk.
#[derive(Deserialize)]
pub struct CreateMemoryRequest {
    pub title: String,
    pub description: Option<String>,
    pub image_path: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Update memory request; omitted fields keep their stored values.
#[derive(Deserialize)]
pub struct UpdateMemoryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_path: Option<PathBuf>,
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub image_url: Option<String>,
}

/// List memories, newest first.
pub async fn list_memories(
    State(state): State<AppState>,
) -> Result<Json<Vec<MemoryResponse>>, StatusCode> {
    let records = state.service.list().await.map_err(error_status)?;
    Ok(Json(records.into_iter().map(MemoryResponse::from).collect()))
}

/// Create a memory.
pub async fn create_memory(
    State(state): State<AppState>,
    Json(payload): Json<CreateMemoryRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), StatusCode> {
    let draft = MemoryDraft {
        title: payload.title,
        description: payload.description,
        image: payload.image_path.map(LocalAsset::new),
    };
    let id = state.service.create(draft).await.map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Partially update a memory.
pub async fn update_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMemoryRequest>,
) -> Result<StatusCode, StatusCode> {
    let patch = MemoryPatch {
        title: payload.title,
        description: payload.description,
        image: payload.image_path.map(LocalAsset::new),
    };
    state
        .service
        .update(&id, patch)
        .await
        .map_err(error_status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a memory and its blob.
pub async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, StatusCode> {
    state
        .service
        .delete(&id, query.image_url.as_deref().unwrap_or(""))
        .await
        .map_err(error_status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Serve a local blob by its (decoded) object path.
pub async fn fetch_media(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let root = state.blob_root.as_ref().ok_or(StatusCode::NOT_FOUND)?;
    if path
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    let file = root.join(&path);
    let bytes = tokio::fs::read(&file)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(([(header::CONTENT_TYPE, content_type_for_path(&path))], bytes))
}

fn error_status(err: Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

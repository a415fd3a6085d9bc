//! Recording ingestion and retrieval endpoints.
//!
//! Provides HTTP endpoints for:
//! - Uploading a chunk of an in-progress recording (PUT/POST /stream/...)
//! - Finalizing a session into one playable file (POST /finalize/...)
//! - Looking up, downloading, and deleting final artifacts (/recordings/...)

use crate::api::error::{ApiError, ApiResult};
use crate::storage::{ChunkWriter, Finalizer, RecordingCatalog};
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, State},
    http::header,
    response::{Json, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::error;

#[derive(Clone)]
pub struct RecordingsState {
    pub writer: Arc<ChunkWriter>,
    pub finalizer: Arc<Finalizer>,
    pub catalog: Arc<RecordingCatalog>,
}

/// Creates the recordings router with all ingestion and retrieval endpoints.
pub fn router(state: RecordingsState, max_chunk_bytes: usize) -> Router {
    Router::new()
        .route(
            "/stream/{session_id}/{chunk_index}",
            put(upload_chunk).post(upload_chunk),
        )
        .route("/finalize/{session_id}", post(finalize_session))
        .route(
            "/recordings/{platform}/{native_meeting_id}",
            get(get_recording).delete(delete_recording),
        )
        .route(
            "/recordings/{platform}/{native_meeting_id}/download",
            get(download_recording),
        )
        .layer(DefaultBodyLimit::max(max_chunk_bytes))
        .with_state(state)
}

/// PUT /stream/:session_id/:chunk_index - Persist one chunk.
///
/// The raw request body is the chunk payload. The write is durable and
/// verified before the acknowledgment is returned; on verification failure
/// the client retries this chunk only.
async fn upload_chunk(
    State(state): State<RecordingsState>,
    Path((session_id, chunk_index)): Path<(String, u32)>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let ack = state
        .writer
        .write_chunk(&session_id, chunk_index, &body)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(json!({
        "status": "ok",
        "session_id": ack.session_id,
        "chunk_index": ack.sequence_index,
        "size": ack.bytes_written,
    })))
}

/// POST /finalize/:session_id - Merge all chunks into the final recording.
async fn finalize_session(
    State(state): State<RecordingsState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let artifact = state
        .finalizer
        .finalize(&session_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(json!({
        "status": "ok",
        "session_id": session_id,
        "filename": artifact.filename,
        "chunks_merged": artifact.chunks_merged,
        "file_size": artifact.file_size,
    })))
}

/// GET /recordings/:platform/:native_meeting_id - Artifact metadata.
async fn get_recording(
    State(state): State<RecordingsState>,
    Path((platform, native_meeting_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let info = state
        .catalog
        .find_latest(&native_meeting_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "Recording not found for platform={}, id={}",
                platform, native_meeting_id
            ))
        })?;

    Ok(Json(json!({
        "platform": platform,
        "native_meeting_id": native_meeting_id,
        "filename": info.filename,
        "file_size": info.file_size,
        "created_at": info.created_at,
    })))
}

/// GET /recordings/:platform/:native_meeting_id/download - Stream the file.
async fn download_recording(
    State(state): State<RecordingsState>,
    Path((platform, native_meeting_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let info = state
        .catalog
        .find_latest(&native_meeting_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "Recording not found for platform={}, id={}",
                platform, native_meeting_id
            ))
        })?;

    let file = tokio::fs::File::open(&info.path).await.map_err(|e| {
        error!("Failed to open artifact {:?}: {}", info.path, e);
        ApiError::internal("Failed to open recording file")
    })?;

    let body = Body::from_stream(ReaderStream::new(file));
    Response::builder()
        .header(header::CONTENT_TYPE, "audio/webm")
        .header(header::CONTENT_LENGTH, info.file_size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", info.filename),
        )
        .body(body)
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// DELETE /recordings/:platform/:native_meeting_id - Remove the artifact.
async fn delete_recording(
    State(state): State<RecordingsState>,
    Path((_platform, native_meeting_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    state
        .catalog
        .delete(&native_meeting_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(json!({
        "message": "Recording deleted successfully",
    })))
}

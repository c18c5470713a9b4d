use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    ApiError, ApiResponse, AppState,
    types::{AudioDataDto, AudioRecordDto, MessageResponse, PageQuery, Paged},
};
use crate::db::{AudioRecordUpdate, NewAudioRecord};
use crate::security::{Principal, authorize};

#[derive(Deserialize)]
pub struct CreateAudioRequest {
    pub filename: String,
    pub audio_data: String,
    pub description: Option<String>,
    pub duration_seconds: Option<i32>,
}

#[derive(Deserialize)]
pub struct UpdateAudioRequest {
    pub audio_data: Option<String>,
    pub description: Option<String>,
}

/// GET /audio
/// The caller's own recordings, newest first.
pub async fn list_own(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paged<AudioRecordDto>>>, ApiError> {
    list_records(&state, principal.user_id, &query).await
}

/// GET /audio/user/{user_id}
/// Another user's recordings; owner-or-admin only.
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<i32>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paged<AudioRecordDto>>>, ApiError> {
    authorize(&principal, user_id).map_err(|_| ApiError::forbidden())?;

    list_records(&state, user_id, &query).await
}

async fn list_records(
    state: &AppState,
    user_id: i32,
    query: &PageQuery,
) -> Result<Json<ApiResponse<Paged<AudioRecordDto>>>, ApiError> {
    let (page, limit) = query.normalized();

    let (records, total) = state
        .store()
        .list_audio_by_owner(user_id, page, limit)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list audio records: {e}")))?;

    Ok(Json(ApiResponse::success(Paged {
        page,
        limit,
        total,
        records: records.into_iter().map(AudioRecordDto::from).collect(),
    })))
}

/// GET /audio/{id}
/// Metadata only; the payload stays sealed.
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AudioRecordDto>>, ApiError> {
    let record = state
        .store()
        .get_audio_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load audio record: {e}")))?
        .ok_or_else(|| ApiError::not_found("Audio record", id))?;

    authorize(&principal, record.user_id).map_err(|_| ApiError::forbidden())?;

    Ok(Json(ApiResponse::success(AudioRecordDto::from(record))))
}

/// GET /audio/{id}/data
/// Decrypts and verifies the payload. An integrity failure surfaces as a
/// distinct error with `integrity_error: true`, never as a plain 404/500.
pub async fn get_data(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AudioDataDto>>, ApiError> {
    let record = state
        .store()
        .get_audio_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load audio record: {e}")))?
        .ok_or_else(|| ApiError::not_found("Audio record", id))?;

    authorize(&principal, record.user_id).map_err(|_| ApiError::forbidden())?;

    let content = state
        .store()
        .get_audio_content(state.cipher_key(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Audio record", id))?;

    Ok(Json(ApiResponse::success(AudioDataDto {
        id,
        filename: record.filename,
        audio_data: content.audio_data,
        integrity_verified: content.integrity_verified,
    })))
}

/// POST /audio
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateAudioRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.filename.trim().is_empty() {
        return Err(ApiError::validation("Filename is required"));
    }
    if payload.audio_data.is_empty() {
        return Err(ApiError::validation("Audio payload is required"));
    }

    let record = state
        .store()
        .create_audio_record(
            state.cipher_key(),
            NewAudioRecord {
                user_id: principal.user_id,
                filename: payload.filename,
                audio_data: payload.audio_data,
                description: payload.description,
                duration_seconds: payload.duration_seconds,
            },
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create audio record: {e}")))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AudioRecordDto::from(record))),
    ))
}

/// PUT /audio/{id}
/// New audio content reseals the envelope and regenerates the digest in the
/// same write.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateAudioRequest>,
) -> Result<Json<ApiResponse<AudioRecordDto>>, ApiError> {
    let record = state
        .store()
        .get_audio_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load audio record: {e}")))?
        .ok_or_else(|| ApiError::not_found("Audio record", id))?;

    authorize(&principal, record.user_id).map_err(|_| ApiError::forbidden())?;

    state
        .store()
        .update_audio_record(
            state.cipher_key(),
            id,
            AudioRecordUpdate {
                audio_data: payload.audio_data,
                description: payload.description,
            },
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update audio record: {e}")))?;

    let updated = state
        .store()
        .get_audio_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to reload audio record: {e}")))?
        .ok_or_else(|| ApiError::not_found("Audio record", id))?;

    Ok(Json(ApiResponse::success(AudioRecordDto::from(updated))))
}

/// DELETE /audio/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let record = state
        .store()
        .get_audio_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load audio record: {e}")))?
        .ok_or_else(|| ApiError::not_found("Audio record", id))?;

    authorize(&principal, record.user_id).map_err(|_| ApiError::forbidden())?;

    state
        .store()
        .delete_audio_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete audio record: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Audio record deleted successfully",
    ))))
}

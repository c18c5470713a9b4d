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
    types::{FinancialContentDto, FinancialRecordDto, MessageResponse, Paged},
};
use crate::db::{FinancialRecordUpdate, NewFinancialRecord};
use crate::security::{Principal, authorize};

#[derive(Deserialize)]
pub struct FinancialListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub data_type: Option<String>,
}

const fn default_page() -> u64 {
    1
}

const fn default_limit() -> u64 {
    10
}

#[derive(Deserialize)]
pub struct CreateFinancialRequest {
    pub data_type: String,
    pub content: String,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateFinancialRequest {
    pub content: Option<String>,
    pub notes: Option<String>,
}

/// GET /financial
/// The caller's own records, newest first, optionally filtered by type.
pub async fn list_own(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<FinancialListQuery>,
) -> Result<Json<ApiResponse<Paged<FinancialRecordDto>>>, ApiError> {
    list_records(&state, principal.user_id, &query).await
}

/// GET /financial/user/{user_id}
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<i32>,
    Query(query): Query<FinancialListQuery>,
) -> Result<Json<ApiResponse<Paged<FinancialRecordDto>>>, ApiError> {
    authorize(&principal, user_id).map_err(|_| ApiError::forbidden())?;

    list_records(&state, user_id, &query).await
}

async fn list_records(
    state: &AppState,
    user_id: i32,
    query: &FinancialListQuery,
) -> Result<Json<ApiResponse<Paged<FinancialRecordDto>>>, ApiError> {
    let page = if query.page == 0 { 1 } else { query.page };
    let limit = if query.limit == 0 || query.limit > 100 {
        10
    } else {
        query.limit
    };

    let (records, total) = state
        .store()
        .list_financial_by_owner(user_id, query.data_type.as_deref(), page, limit)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list financial records: {e}")))?;

    Ok(Json(ApiResponse::success(Paged {
        page,
        limit,
        total,
        records: records.into_iter().map(FinancialRecordDto::from).collect(),
    })))
}

/// GET /financial/{id}
/// Metadata only; the payload stays sealed.
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<FinancialRecordDto>>, ApiError> {
    let record = state
        .store()
        .get_financial_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load financial record: {e}")))?
        .ok_or_else(|| ApiError::not_found("Financial record", id))?;

    authorize(&principal, record.user_id).map_err(|_| ApiError::forbidden())?;

    Ok(Json(ApiResponse::success(FinancialRecordDto::from(record))))
}

/// GET /financial/{id}/content
/// Decrypts and verifies the payload. An integrity failure surfaces as a
/// distinct error with `integrity_error: true`.
pub async fn get_content(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<FinancialContentDto>>, ApiError> {
    let record = state
        .store()
        .get_financial_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load financial record: {e}")))?
        .ok_or_else(|| ApiError::not_found("Financial record", id))?;

    authorize(&principal, record.user_id).map_err(|_| ApiError::forbidden())?;

    let content = state
        .store()
        .get_financial_content(state.cipher_key(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Financial record", id))?;

    Ok(Json(ApiResponse::success(FinancialContentDto {
        id,
        data_type: record.data_type,
        content: content.content,
        integrity_verified: content.integrity_verified,
    })))
}

/// POST /financial
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateFinancialRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.data_type.trim().is_empty() {
        return Err(ApiError::validation("Data type is required"));
    }
    if payload.content.is_empty() {
        return Err(ApiError::validation("Content is required"));
    }

    let record = state
        .store()
        .create_financial_record(
            state.cipher_key(),
            NewFinancialRecord {
                user_id: principal.user_id,
                data_type: payload.data_type,
                content: payload.content,
                notes: payload.notes,
            },
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create financial record: {e}")))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(FinancialRecordDto::from(record))),
    ))
}

/// PUT /financial/{id}
/// New content reseals the envelope and regenerates the digest in the same
/// write; any update stamps `modified_at`.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateFinancialRequest>,
) -> Result<Json<ApiResponse<FinancialRecordDto>>, ApiError> {
    let record = state
        .store()
        .get_financial_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load financial record: {e}")))?
        .ok_or_else(|| ApiError::not_found("Financial record", id))?;

    authorize(&principal, record.user_id).map_err(|_| ApiError::forbidden())?;

    state
        .store()
        .update_financial_record(
            state.cipher_key(),
            id,
            FinancialRecordUpdate {
                content: payload.content,
                notes: payload.notes,
            },
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update financial record: {e}")))?;

    let updated = state
        .store()
        .get_financial_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to reload financial record: {e}")))?
        .ok_or_else(|| ApiError::not_found("Financial record", id))?;

    Ok(Json(ApiResponse::success(FinancialRecordDto::from(
        updated,
    ))))
}

/// DELETE /financial/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let record = state
        .store()
        .get_financial_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load financial record: {e}")))?
        .ok_or_else(|| ApiError::not_found("Financial record", id))?;

    authorize(&principal, record.user_id).map_err(|_| ApiError::forbidden())?;

    state
        .store()
        .delete_financial_record(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete financial record: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Financial record deleted successfully",
    ))))
}

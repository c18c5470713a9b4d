use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, auth::client_meta, types::UserDto};
use crate::db::UserUpdate;
use crate::security::{Principal, authorize};

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// GET /users/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .store()
        .get_user(principal.user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        .ok_or_else(|| ApiError::not_found("User", principal.user_id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PUT /users/profile
/// Self-service update of email and display name. Role and activity flag are
/// admin-only and cannot be reached from here.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if let Some(email) = &payload.email
        && !email.contains('@')
    {
        return Err(ApiError::validation("Email address is invalid"));
    }
    if let Some(full_name) = &payload.full_name
        && full_name.trim().len() < 2
    {
        return Err(ApiError::validation(
            "Full name must be at least 2 characters",
        ));
    }

    let updated = state
        .store()
        .update_user(
            principal.user_id,
            UserUpdate {
                email: payload.email,
                full_name: payload.full_name,
                ..Default::default()
            },
            state.security(),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update profile: {e}")))?;

    if !updated {
        return Err(ApiError::not_found("User", principal.user_id));
    }

    let (ip_address, user_agent) = client_meta(&headers);
    if let Err(e) = state
        .store()
        .record_access(
            Some(principal.user_id),
            "PROFILE_UPDATE",
            ip_address,
            user_agent,
            true,
        )
        .await
    {
        tracing::warn!("Failed to write access log entry (PROFILE_UPDATE): {e}");
    }

    let user = state
        .store()
        .get_user(principal.user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to reload user: {e}")))?
        .ok_or_else(|| ApiError::not_found("User", principal.user_id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// GET /users/{id}
/// Owner-or-admin only; regular users cannot enumerate other accounts.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    authorize(&principal, id).map_err(|_| ApiError::forbidden())?;

    let user = state
        .store()
        .get_user(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

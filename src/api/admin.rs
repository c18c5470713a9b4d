//! Admin-only user management and access-log inspection. Every route in
//! here sits behind both the auth middleware and the admin gate.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    ApiError, ApiResponse, AppState,
    auth::client_meta,
    types::{AccessLogDto, MessageResponse, PageQuery, Paged, UserDto},
};
use crate::db::{NewUser, UserUpdate};
use crate::security::{Principal, Role};

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paged<UserDto>>>, ApiError> {
    let (page, limit) = query.normalized();

    let (users, total) = state
        .store()
        .list_users(page, limit)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list users: {e}")))?;

    Ok(Json(ApiResponse::success(Paged {
        page,
        limit,
        total,
        records: users.into_iter().map(UserDto::from).collect(),
    })))
}

/// GET /admin/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .store()
        .get_user(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// POST /admin/users
/// Unlike self-registration, an admin may assign any role.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.username.trim().len() < 3 {
        return Err(ApiError::validation(
            "Username must be at least 3 characters",
        ));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }
    if !payload.email.contains('@') {
        return Err(ApiError::validation("Email address is invalid"));
    }

    let role = match payload.role.as_deref() {
        None => Role::User,
        Some(value) => {
            Role::parse(value).ok_or_else(|| ApiError::validation("Unknown role"))?
        }
    };

    let taken = state
        .store()
        .user_exists(&payload.username, &payload.email)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to check user existence: {e}")))?;

    if taken {
        return Err(ApiError::conflict(
            "A user with this username or email already exists",
        ));
    }

    let user = state
        .store()
        .create_user(
            NewUser {
                username: payload.username,
                password: payload.password,
                email: payload.email,
                full_name: payload.full_name,
                role,
            },
            state.security(),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create user: {e}")))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(user))),
    ))
}

/// PUT /admin/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let role = match payload.role.as_deref() {
        None => None,
        Some(value) => {
            Some(Role::parse(value).ok_or_else(|| ApiError::validation("Unknown role"))?)
        }
    };

    if let Some(password) = &payload.password
        && password.len() < 8
    {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }

    let updated = state
        .store()
        .update_user(
            id,
            UserUpdate {
                email: payload.email,
                full_name: payload.full_name,
                role,
                is_active: payload.is_active,
                password: payload.password,
            },
            state.security(),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update user: {e}")))?;

    if !updated {
        return Err(ApiError::not_found("User", id));
    }

    let (ip_address, user_agent) = client_meta(&headers);
    if let Err(e) = state
        .store()
        .record_access(
            Some(principal.user_id),
            "USER_UPDATE",
            ip_address,
            user_agent,
            true,
        )
        .await
    {
        tracing::warn!("Failed to write access log entry (USER_UPDATE): {e}");
    }

    let user = state
        .store()
        .get_user(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to reload user: {e}")))?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// DELETE /admin/users/{id}
/// Hard delete; the user's records are not versioned or retained.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let deleted = state
        .store()
        .delete_user(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete user: {e}")))?;

    if !deleted {
        return Err(ApiError::not_found("User", id));
    }

    let (ip_address, user_agent) = client_meta(&headers);
    if let Err(e) = state
        .store()
        .record_access(
            Some(principal.user_id),
            "USER_DELETE",
            ip_address,
            user_agent,
            true,
        )
        .await
    {
        tracing::warn!("Failed to write access log entry (USER_DELETE): {e}");
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "User deleted successfully",
    ))))
}

/// GET /admin/logs
pub async fn list_access_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paged<AccessLogDto>>>, ApiError> {
    let (page, limit) = query.normalized();

    let (entries, total) = state
        .store()
        .list_access_logs(page, limit)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list access logs: {e}")))?;

    Ok(Json(ApiResponse::success(Paged {
        page,
        limit,
        total,
        records: entries.into_iter().map(AccessLogDto::from).collect(),
    })))
}

use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, types::MessageResponse, types::UserDto};
use crate::db::NewUser;
use crate::security::password::generate_temp_password;
use crate::security::{Principal, Role};

/// Reset tokens issued by the forgot-password flow stay valid for one hour.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default, rename = "loginType")]
    pub login_type: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserDto,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct ForgotPasswordResponse {
    pub message: String,
    /// The temporary password is echoed to the caller in addition to the
    /// out-of-band delivery. Questionable, but part of the external contract.
    #[serde(rename = "tempPassword")]
    pub temp_password: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: UserDto,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware: verifies the `Authorization: Bearer` token,
/// then re-resolves the subject to a live user row. A signed token whose
/// user has been deleted or deactivated is rejected exactly like a forged
/// one.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let claims = state.signer().verify(token)?;

    let user = state
        .store()
        .get_user(claims.sub)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to resolve token subject: {e}")))?;

    let Some(user) = user else {
        return Err(ApiError::unauthorized("Invalid authentication token"));
    };
    if !user.is_active {
        return Err(ApiError::unauthorized("Invalid authentication token"));
    }

    // The role comes from the user row, not the token, so role changes take
    // effect without waiting for token expiry.
    let role = Role::parse(&user.role).unwrap_or(Role::User);

    request.extensions_mut().insert(Principal {
        user_id: user.id,
        role,
    });

    Ok(next.run(request).await)
}

/// Admin gate layered inside [`auth_middleware`].
pub async fn require_admin(
    Extension(principal): Extension<Principal>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !principal.is_admin() {
        return Err(ApiError::forbidden());
    }

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Best-effort client metadata for the access log. The IP comes from the
/// reverse proxy's X-Forwarded-For header when present.
pub(super) fn client_meta(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string());

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    (ip_address, user_agent)
}

async fn log_access(
    state: &AppState,
    headers: &HeaderMap,
    user_id: Option<i32>,
    action: &str,
    success: bool,
) {
    let (ip_address, user_agent) = client_meta(headers);
    if let Err(e) = state
        .store()
        .record_access(user_id, action, ip_address, user_agent, success)
        .await
    {
        tracing::warn!("Failed to write access log entry ({action}): {e}");
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Create a regular user account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
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
                role: Role::User,
            },
            state.security(),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create user: {e}")))?;

    log_access(&state, &headers, Some(user.id), "REGISTER", true).await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(user))),
    ))
}

/// POST /auth/login
/// Verify credentials and issue a session token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let user = state
        .store()
        .get_user_by_username(&payload.username)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to query user: {e}")))?;

    let Some(user) = user else {
        log_access(&state, &headers, None, "LOGIN_ATTEMPT", false).await;
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    let is_valid = state
        .store()
        .verify_credentials(&payload.username, &payload.password)
        .await
        .map_err(|e| ApiError::internal(format!("Password verification failed: {e}")))?;

    if !is_valid || !user.is_active {
        log_access(&state, &headers, Some(user.id), "LOGIN_ATTEMPT", false).await;
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let role = Role::parse(&user.role).unwrap_or(Role::User);

    // The admin login form refuses regular accounts even with a valid
    // password.
    if payload.login_type.as_deref() == Some("admin") && role != Role::Admin {
        log_access(&state, &headers, Some(user.id), "LOGIN_ATTEMPT", false).await;
        return Err(ApiError::forbidden());
    }

    let token = state
        .signer()
        .issue(user.id, role)
        .map_err(|e| ApiError::internal(format!("Failed to issue token: {e}")))?;

    if let Err(e) = state.store().touch_last_login(user.id).await {
        tracing::warn!("Failed to update last_login for user {}: {e}", user.id);
    }

    log_access(&state, &headers, Some(user.id), "LOGIN", true).await;

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        user: UserDto::from(user),
    })))
}

/// POST /auth/logout
/// Tokens are stateless, so logout is a log entry; the client discards the
/// token and it stays technically valid until expiry.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
) -> Json<ApiResponse<MessageResponse>> {
    log_access(&state, &headers, Some(principal.user_id), "LOGOUT", true).await;

    Json(ApiResponse::success(MessageResponse::new(
        "Logged out successfully",
    )))
}

/// GET /auth/verify
/// Reached only through the auth middleware, so the token is already valid.
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<VerifyResponse>>, ApiError> {
    let user = state
        .store()
        .get_user(principal.user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        .ok_or_else(|| ApiError::unauthorized("Invalid authentication token"))?;

    Ok(Json(ApiResponse::success(VerifyResponse {
        valid: true,
        user: UserDto::from(user),
    })))
}

/// POST /auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::validation(
            "New password must be at least 8 characters",
        ));
    }
    if payload.current_password == payload.new_password {
        return Err(ApiError::validation(
            "New password must be different from current password",
        ));
    }

    let is_valid = state
        .store()
        .verify_password_for_id(principal.user_id, &payload.current_password)
        .await
        .map_err(|e| ApiError::internal(format!("Password verification failed: {e}")))?;

    if !is_valid {
        log_access(
            &state,
            &headers,
            Some(principal.user_id),
            "PASSWORD_CHANGE",
            false,
        )
        .await;
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let updated = state
        .store()
        .change_password(principal.user_id, &payload.new_password, state.security())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to change password: {e}")))?;

    if !updated {
        return Err(ApiError::not_found("User", principal.user_id));
    }

    log_access(
        &state,
        &headers,
        Some(principal.user_id),
        "PASSWORD_CHANGE",
        true,
    )
    .await;

    tracing::info!("Password changed for user {}", principal.user_id);

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}

/// POST /auth/forgot-password
/// Issues a temporary password (and a reset token for the token-based flow).
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    let user = state
        .store()
        .get_user_by_email(&payload.email)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to query user: {e}")))?
        .ok_or_else(|| ApiError::NotFound("No user found with this email".to_string()))?;

    let temp_password = generate_temp_password();

    let updated = state
        .store()
        .change_password(user.id, &temp_password, state.security())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update password: {e}")))?;

    if !updated {
        return Err(ApiError::not_found("User", user.id));
    }

    let reset_token = uuid::Uuid::new_v4().to_string();
    let expiry =
        (chrono::Utc::now() + chrono::Duration::hours(RESET_TOKEN_TTL_HOURS)).to_rfc3339();
    state
        .store()
        .set_reset_token(user.id, &reset_token, &expiry)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store reset token: {e}")))?;

    log_access(&state, &headers, Some(user.id), "PASSWORD_RESET", true).await;

    // Mail delivery is handled outside this service; the dispatch itself is
    // only traced here.
    tracing::info!("Temporary password issued for user {}", user.id);

    Ok(Json(ForgotPasswordResponse {
        message: "A temporary password has been sent to your email address".to_string(),
        temp_password,
    }))
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::validation(
            "New password must be at least 8 characters",
        ));
    }

    let user = state
        .store()
        .get_user_by_reset_token(&payload.token)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to query reset token: {e}")))?
        .ok_or_else(|| ApiError::validation("Reset token is invalid or expired"))?;

    state
        .store()
        .change_password(user.id, &payload.new_password, state.security())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to reset password: {e}")))?;

    state
        .store()
        .clear_reset_token(user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to clear reset token: {e}")))?;

    log_access(&state, &headers, Some(user.id), "PASSWORD_RESET", true).await;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password reset successfully",
    ))))
}

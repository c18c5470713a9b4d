use axum::{
    Json, Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, SecurityConfig};
use crate::db::Store;
use crate::security::{EncryptionKey, TokenSigner};
use crate::state::SharedState;

mod admin;
mod audio;
pub mod auth;
mod error;
mod financial;
mod types;
mod users;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn cipher_key(&self) -> &EncryptionKey {
        &self.shared.cipher_key
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.shared.signer
    }

    #[must_use]
    pub fn security(&self) -> &SecurityConfig {
        &self.shared.config.security
    }
}

pub async fn create_app_state(shared: Arc<SharedState>) -> anyhow::Result<Arc<AppState>> {
    Ok(Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
    }))
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared).await
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/", get(welcome))
        .nest("/api", api_router)
        .fallback(not_found)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/verify", get(auth::verify_token))
        .route("/auth/change-password", post(auth::change_password))
        .route("/users/profile", get(users::get_profile))
        .route("/users/profile", put(users::update_profile))
        .route("/users/{id}", get(users::get_user))
        .route("/audio", get(audio::list_own).post(audio::create))
        .route("/audio/user/{user_id}", get(audio::list_for_user))
        .route(
            "/audio/{id}",
            get(audio::get_record)
                .put(audio::update)
                .delete(audio::delete),
        )
        .route("/audio/{id}/data", get(audio::get_data))
        .route(
            "/financial",
            get(financial::list_own).post(financial::create),
        )
        .route("/financial/user/{user_id}", get(financial::list_for_user))
        .route(
            "/financial/{id}",
            get(financial::get_record)
                .put(financial::update)
                .delete(financial::delete),
        )
        .route("/financial/{id}/content", get(financial::get_content))
        .merge(create_admin_router())
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

/// Admin routes carry the admin gate inside the auth middleware.
fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route(
            "/admin/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/admin/logs", get(admin::list_access_logs))
        .route_layer(middleware::from_fn(auth::require_admin))
}

async fn welcome() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Moustass Web API" }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

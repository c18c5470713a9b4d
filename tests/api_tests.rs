use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use moustass_web::api::AppState;
use moustass_web::config::Config;
use std::sync::Arc;
use tower::ServiceExt;

/// Password of the admin user seeded by the initial migration.
const ADMIN_PASSWORD: &str = "password";

async fn spawn_app() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // A single connection keeps the in-memory database alive for the whole
    // test.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.security.encryption_key =
        moustass_web::security::EncryptionKey::generate_base64();
    config.security.jwt_secret = "integration-test-secret".to_string();
    // Keep password hashing cheap in tests.
    config.security.argon2_memory_cost_kib = 512;
    config.security.argon2_time_cost = 1;

    let state = moustass_web::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    (moustass_web::api::router(state.clone()), state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn register_user(app: &Router, username: &str, password: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            &serde_json::json!({
                "username": username,
                "password": password,
                "email": format!("{username}@example.com"),
                "full_name": format!("{username} Test"),
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &serde_json::json!({ "username": username, "password": password }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_welcome_and_fallback() {
    let (app, _state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get_request("/", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/no/such/route", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_register_login_flow() {
    let (app, _state) = spawn_app().await;

    let body = register_user(&app, "alice", "correct horse").await;
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["role"], "user");

    // Short password is rejected before touching the store.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            &serde_json::json!({
                "username": "bob",
                "password": "short",
                "email": "bob@example.com",
                "full_name": "Bob Test",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Duplicate username conflicts.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            &serde_json::json!({
                "username": "alice",
                "password": "another pass",
                "email": "alice2@example.com",
                "full_name": "Alice Again",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Wrong password is a 401.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &serde_json::json!({ "username": "alice", "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A regular account cannot use the admin login form.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &serde_json::json!({
                "username": "alice",
                "password": "correct horse",
                "loginType": "admin",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let token = login(&app, "alice", "correct horse").await;

    // The token resolves back to the account.
    let response = app
        .clone()
        .oneshot(get_request("/api/auth/verify", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["user"]["username"], "alice");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let (app, _state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get_request("/api/audio", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get_request("/api/audio", Some("garbage-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Valid JWT shape signed with a different secret.
    let foreign = moustass_web::security::TokenSigner::new("some-other-secret", 24)
        .issue(1, moustass_web::security::Role::Admin)
        .unwrap();
    let response = app
        .clone()
        .oneshot(get_request("/api/audio", Some(&foreign)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_financial_roundtrip_and_integrity() {
    let (app, state) = spawn_app().await;

    register_user(&app, "carol", "carol-password").await;
    let token = login(&app, "carol", "carol-password").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/financial",
            Some(&token),
            &serde_json::json!({
                "data_type": "balance",
                "content": "balance: 1000",
                "notes": "checking account",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let record_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["has_encrypted_content"], true);

    // Content round-trips through seal/open with the digest verified.
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/financial/{record_id}/content"),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["content"], "balance: 1000");
    assert_eq!(body["data"]["integrity_verified"], true);

    // Corrupt the stored digest behind the API's back.
    use sea_orm::{ConnectionTrait, Statement};
    let backend = state.store().conn.get_database_backend();
    state
        .store()
        .conn
        .execute(Statement::from_string(
            backend,
            format!(
                "UPDATE financial_data SET hash_verification = '{}' WHERE id = {record_id}",
                "0".repeat(64)
            ),
        ))
        .await
        .unwrap();

    // The read now fails with the explicit integrity flag, not a plain 500.
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/financial/{record_id}/content"),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["integrity_error"], true);
    assert_eq!(body["success"], false);

    // Metadata reads do not decrypt and stay unaffected.
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/financial/{record_id}"),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_audio_crud_and_authorization() {
    let (app, _state) = spawn_app().await;

    register_user(&app, "dave", "dave-password").await;
    register_user(&app, "erin", "erin-password").await;
    let dave = login(&app, "dave", "dave-password").await;
    let erin = login(&app, "erin", "erin-password").await;
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/audio",
            Some(&dave),
            &serde_json::json!({
                "filename": "memo-001.webm",
                "audio_data": "UklGRiQAAABXQVZF",
                "description": "first memo",
                "duration_seconds": 12,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let record_id = body["data"]["id"].as_i64().unwrap();

    // A different regular user is rejected on every content operation.
    for request in [
        get_request(&format!("/api/audio/{record_id}"), Some(&erin)),
        get_request(&format!("/api/audio/{record_id}/data"), Some(&erin)),
        json_request(
            "PUT",
            &format!("/api/audio/{record_id}"),
            Some(&erin),
            &serde_json::json!({ "description": "hijacked" }),
        ),
        json_request(
            "DELETE",
            &format!("/api/audio/{record_id}"),
            Some(&erin),
            &serde_json::json!({}),
        ),
    ] {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    // The owner reads the decrypted payload back.
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/audio/{record_id}/data"),
            Some(&dave),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["audio_data"], "UklGRiQAAABXQVZF");
    assert_eq!(body["data"]["integrity_verified"], true);

    // Admins can access any user's records.
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/audio/{record_id}/data"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Content update reseals; the new payload reads back verified.
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/audio/{record_id}"),
            Some(&dave),
            &serde_json::json!({
                "audio_data": "UklGRiRNRVcAAAA=",
                "description": "second take",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/audio/{record_id}/data"),
            Some(&dave),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["audio_data"], "UklGRiRNRVcAAAA=");
    assert_eq!(body["data"]["integrity_verified"], true);

    // Owner delete, then the record is gone.
    let response = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/api/audio/{record_id}"),
            Some(&dave),
            &serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/audio/{record_id}"),
            Some(&dave),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_financial_pagination() {
    let (app, _state) = spawn_app().await;

    register_user(&app, "frank", "frank-password").await;
    let token = login(&app, "frank", "frank-password").await;

    for i in 1..=15 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/financial",
                Some(&token),
                &serde_json::json!({
                    "data_type": "note",
                    "content": format!("entry {i}"),
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(get_request("/api/financial?page=1&limit=10", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 15);
    assert_eq!(body["data"]["records"].as_array().unwrap().len(), 10);

    let response = app
        .clone()
        .oneshot(get_request("/api/financial?page=2&limit=10", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["total"], 15);

    let records = body["data"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 5);

    // Newest-first ordering: page 2 holds the five oldest records.
    let first_page_ids: Vec<i64> = {
        let response = app
            .clone()
            .oneshot(get_request("/api/financial?page=1&limit=10", Some(&token)))
            .await
            .unwrap();
        let body = body_json(response).await;
        body["data"]["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect()
    };
    let min_first_page = first_page_ids.iter().min().unwrap().to_owned();
    for record in records {
        assert!(record["id"].as_i64().unwrap() < min_first_page);
    }
}

#[tokio::test]
async fn test_admin_user_management() {
    let (app, _state) = spawn_app().await;

    register_user(&app, "grace", "grace-password").await;
    let grace = login(&app, "grace", "grace-password").await;
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;

    // Regular users are shut out of the admin surface.
    let response = app
        .clone()
        .oneshot(get_request("/api/admin/users", Some(&grace)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(get_request("/api/admin/users", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    // Seeded admin + grace.
    assert_eq!(body["data"]["total"], 2);

    // Admin creates a user with an explicit role.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/admin/users",
            Some(&admin),
            &serde_json::json!({
                "username": "heidi",
                "password": "heidi-password",
                "email": "heidi@example.com",
                "full_name": "Heidi Ops",
                "role": "admin",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], "admin");

    // Deactivating grace invalidates her still-signed token on next use.
    let grace_id = {
        let response = app
            .clone()
            .oneshot(get_request("/api/users/profile", Some(&grace)))
            .await
            .unwrap();
        let body = body_json(response).await;
        body["data"]["id"].as_i64().unwrap()
    };

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/admin/users/{grace_id}"),
            Some(&admin),
            &serde_json::json!({ "is_active": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/api/users/profile", Some(&grace)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Hard delete removes the row; the lookup 404s afterwards.
    let response = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/api/admin/users/{grace_id}"),
            Some(&admin),
            &serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/admin/users/{grace_id}"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The audit trail recorded the auth activity above.
    let response = app
        .clone()
        .oneshot(get_request("/api/admin/logs", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["total"].as_u64().unwrap() > 0);
    let actions: Vec<String> = body["data"]["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["action"].as_str().unwrap().to_string())
        .collect();
    assert!(actions.iter().any(|a| a == "USER_DELETE"));
    assert!(actions.iter().any(|a| a == "LOGIN"));
}

#[tokio::test]
async fn test_change_password_flow() {
    let (app, _state) = spawn_app().await;

    register_user(&app, "ivan", "original-pass").await;
    let token = login(&app, "ivan", "original-pass").await;

    // Wrong current password is a 401.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/change-password",
            Some(&token),
            &serde_json::json!({
                "currentPassword": "not-the-password",
                "newPassword": "brand-new-pass",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/change-password",
            Some(&token),
            &serde_json::json!({
                "currentPassword": "original-pass",
                "newPassword": "brand-new-pass",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Old password no longer works; the new one does.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &serde_json::json!({ "username": "ivan", "password": "original-pass" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    login(&app, "ivan", "brand-new-pass").await;
}

#[tokio::test]
async fn test_forgot_password_issues_temporary_credentials() {
    let (app, _state) = spawn_app().await;

    register_user(&app, "judy", "judy-password").await;

    // Unknown email is a 404.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            &serde_json::json!({ "email": "nobody@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            &serde_json::json!({ "email": "judy@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    // The temporary password is part of the response contract.
    let temp_password = body["tempPassword"].as_str().unwrap().to_string();
    assert_eq!(temp_password.len(), 8);

    // The old password is replaced by the temporary one.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &serde_json::json!({ "username": "judy", "password": "judy-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    login(&app, "judy", &temp_password).await;
}

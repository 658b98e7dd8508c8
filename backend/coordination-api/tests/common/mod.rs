#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use coordination_api::config::{Config, StoreBackend};
use coordination_api::middlewares::auth::{JwtClaims, JwtService};
use coordination_api::{create_router, AppState};

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        mongo_uri: "mongodb://unused".to_string(),
        mongo_database: "unused".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        store_backend: StoreBackend::Memory,
        notifier_webhook_url: None,
    }
}

pub async fn create_test_app() -> (Router, Arc<AppState>) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let state = Arc::new(
        AppState::new(test_config())
            .await
            .expect("Failed to initialize test app state"),
    );
    (create_router(state.clone()), state)
}

/// Mints a bearer token the way the external identity provider would.
pub fn token_for(user_id: &str, name: &str, role: &str) -> String {
    let now = Utc::now().timestamp() as usize;
    JwtService::new(TEST_JWT_SECRET)
        .generate_token(JwtClaims {
            sub: user_id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            exp: now + 3600,
            iat: now,
        })
        .expect("failed to mint test token")
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    token: &str,
    body: &Value,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    parse_response(response).await
}

pub async fn get(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    parse_response(response).await
}

async fn parse_response(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            panic!(
                "non-JSON response body ({}): {}",
                status,
                String::from_utf8_lossy(&bytes)
            )
        })
    };
    (status, json)
}

/// Assigns `rep_id` as the active representative of `course_code`, acting as
/// a lecturer. Panics on failure so tests fail loudly at the setup step.
pub async fn assign_representative(app: &Router, course_code: &str, rep_id: &str, rep_name: &str) {
    let token = token_for("lect-admin", "Dr. Admin", "lecturer");
    let (status, body) = post_json(
        app,
        "/api/v1/representatives",
        &token,
        &serde_json::json!({
            "courseCode": course_code,
            "courseName": format!("Course {}", course_code),
            "representativeUserId": rep_id,
            "representativeName": rep_name,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "assign failed: {}", body);
}

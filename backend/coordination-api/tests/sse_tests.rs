use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

mod common;

use common::{assign_representative, create_test_app, token_for};

/// The stream endpoint greets a new subscriber with an immediate snapshot
/// event, even when the result set is empty.
#[tokio::test]
async fn request_stream_sends_an_initial_snapshot() {
    let (app, _state) = create_test_app().await;
    assign_representative(&app, "CS101", "stud-1", "Rita Rep").await;

    let token = token_for("lect-1", "Dr. One", "lecturer");
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/requests/stream")
                .header("accept", "text/event-stream")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(
        content_type.starts_with("text/event-stream"),
        "unexpected content type: {}",
        content_type
    );

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("no SSE frame within two seconds")
        .expect("stream ended before the initial snapshot")
        .expect("stream errored");
    let data = frame.into_data().expect("expected a data frame");
    let text = String::from_utf8_lossy(&data);
    assert!(
        text.contains("event: requests-snapshot"),
        "unexpected frame: {}",
        text
    );
    assert!(text.contains("data: []"), "unexpected frame: {}", text);
}

#[tokio::test]
async fn request_stream_requires_authentication() {
    let (app, _state) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/requests/stream")
                .header("accept", "text/event-stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

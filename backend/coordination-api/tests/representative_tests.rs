use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::{assign_representative, create_test_app, get, post_json, token_for};

#[tokio::test]
async fn assign_and_fetch_active_representative() {
    let (app, _state) = create_test_app().await;
    assign_representative(&app, "CS101", "stud-1", "Rita Rep").await;

    let token = token_for("stud-9", "Any Student", "student");
    let (status, body) = get(&app, "/api/v1/representatives/CS101", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["representativeUserId"], "stud-1");
    assert_eq!(body["isActive"], true);
    assert_eq!(body["permissions"]["createAssignmentRequests"], true);
}

#[tokio::test]
async fn student_cannot_assign_representative() {
    let (app, _state) = create_test_app().await;
    let token = token_for("stud-1", "Rita Rep", "student");
    let (status, _body) = post_json(
        &app,
        "/api/v1/representatives",
        &token,
        &json!({
            "courseCode": "CS101",
            "courseName": "Intro to CS",
            "representativeUserId": "stud-1",
            "representativeName": "Rita Rep",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let (app, _state) = create_test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/representatives/mine")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reassignment_supersedes_previous_representative() {
    let (app, _state) = create_test_app().await;
    assign_representative(&app, "CS101", "stud-1", "Old Rep").await;
    assign_representative(&app, "CS101", "stud-2", "New Rep").await;

    let token = token_for("stud-1", "Old Rep", "student");
    let (status, body) = get(&app, "/api/v1/representatives/CS101", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["representativeUserId"], "stud-2");

    // The superseded representative can no longer create requests.
    let (status, _body) = post_json(
        &app,
        "/api/v1/requests",
        &token,
        &json!({
            "type": "assignment",
            "courseCode": "CS101",
            "courseName": "Intro to CS",
            "targetLecturerIds": ["lect-1"],
            "title": "One more assignment",
            "description": "Please",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The old assignment no longer shows in their course list.
    let (status, body) = get(&app, "/api/v1/representatives/mine", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn representative_sees_their_courses() {
    let (app, _state) = create_test_app().await;
    assign_representative(&app, "CS101", "stud-1", "Rita Rep").await;
    assign_representative(&app, "MA202", "stud-1", "Rita Rep").await;
    assign_representative(&app, "PH303", "stud-2", "Other Rep").await;

    let token = token_for("stud-1", "Rita Rep", "student");
    let (status, body) = get(&app, "/api/v1/representatives/mine", &token).await;

    assert_eq!(status, StatusCode::OK);
    let courses: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["courseCode"].as_str().unwrap())
        .collect();
    assert_eq!(courses.len(), 2);
    assert!(courses.contains(&"CS101"));
    assert!(courses.contains(&"MA202"));
}

#[tokio::test]
async fn unknown_course_has_no_representative() {
    let (app, _state) = create_test_app().await;
    let token = token_for("stud-1", "Rita Rep", "student");
    let (status, _body) = get(&app, "/api/v1/representatives/XX999", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

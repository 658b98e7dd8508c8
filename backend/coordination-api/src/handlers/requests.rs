use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::errors::AppError;
use crate::extractors::{Actor, AppJson};
use crate::models::{CreateRequestPayload, RespondToRequestPayload};
use crate::services::request_service::RequestService;
use crate::services::AppState;

fn service(state: &AppState) -> RequestService {
    RequestService::new(state.store.clone(), state.notifier.clone())
}

/// POST /api/v1/requests
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    AppJson(payload): AppJson<CreateRequestPayload>,
) -> Result<impl IntoResponse, AppError> {
    let request = service(&state).create_request(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// POST /api/v1/requests/{id}/responses — a target lecturer's decision.
pub async fn respond_to_request(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(request_id): Path<String>,
    AppJson(payload): AppJson<RespondToRequestPayload>,
) -> Result<impl IntoResponse, AppError> {
    let request = service(&state)
        .respond_to_request(&actor, &request_id, payload)
        .await?;
    Ok(Json(request))
}

/// GET /api/v1/requests/mine — requests authored by the caller.
pub async fn list_my_requests(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
) -> Result<impl IntoResponse, AppError> {
    let requests = service(&state).list_by_requester(&actor.user_id).await?;
    Ok(Json(requests))
}

/// GET /api/v1/requests/inbox — requests targeting the calling lecturer.
pub async fn list_inbox(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
) -> Result<impl IntoResponse, AppError> {
    let requests = service(&state).list_by_lecturer(&actor.user_id).await?;
    Ok(Json(requests))
}

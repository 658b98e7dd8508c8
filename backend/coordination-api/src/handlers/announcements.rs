use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::extractors::{Actor, AppJson};
use crate::models::SendAnnouncementPayload;
use crate::services::announcement_service::AnnouncementService;
use crate::services::AppState;

const DEFAULT_LIMIT: i64 = 20;

/// POST /api/v1/announcements
pub async fn send_announcement(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    AppJson(payload): AppJson<SendAnnouncementPayload>,
) -> Result<impl IntoResponse, AppError> {
    let service = AnnouncementService::new(state.store.clone());
    let announcement = service.send_announcement(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

/// POST /api/v1/announcements/{id}/views — idempotent per user.
pub async fn record_view(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(announcement_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = AnnouncementService::new(state.store.clone());
    let announcement = service.record_view(&announcement_id, &actor.user_id).await?;
    Ok(Json(announcement))
}

/// POST /api/v1/announcements/{id}/acks — idempotent per user.
pub async fn record_acknowledgment(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(announcement_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = AnnouncementService::new(state.store.clone());
    let announcement = service
        .record_acknowledgment(&announcement_id, &actor.user_id)
        .await?;
    Ok(Json(announcement))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/courses/{course_code}/announcements
pub async fn list_announcements(
    State(state): State<Arc<AppState>>,
    Actor(_actor): Actor,
    Path(course_code): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let service = AnnouncementService::new(state.store.clone());
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 100);
    let announcements = service.list_announcements(&course_code, limit).await?;
    Ok(Json(announcements))
}

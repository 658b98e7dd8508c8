use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::errors::AppError;
use crate::extractors::{Actor, AppJson};
use crate::models::AssignRepresentativePayload;
use crate::services::registry_service::RegistryService;
use crate::services::AppState;

/// POST /api/v1/representatives
pub async fn assign_representative(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    AppJson(payload): AppJson<AssignRepresentativePayload>,
) -> Result<impl IntoResponse, AppError> {
    let service = RegistryService::new(state.store.clone());
    let assignment = service.assign_representative(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// GET /api/v1/representatives/{course_code}
pub async fn get_active_representative(
    State(state): State<Arc<AppState>>,
    Actor(_actor): Actor,
    Path(course_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = RegistryService::new(state.store.clone());
    let assignment = service
        .active_representative(&course_code)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("no active representative for course {}", course_code))
        })?;
    Ok(Json(assignment))
}

/// GET /api/v1/representatives/mine — courses the caller represents.
pub async fn list_my_courses(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
) -> Result<impl IntoResponse, AppError> {
    let service = RegistryService::new(state.store.clone());
    let assignments = service.representative_courses(&actor.user_id).await?;
    Ok(Json(assignments))
}

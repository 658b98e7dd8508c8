use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::{
    ActorContext, ActorRole, AssignRepresentativePayload, RepresentativeAssignment,
};
use crate::store::CoordinationStore;

pub struct RegistryService {
    store: Arc<dyn CoordinationStore>,
}

impl RegistryService {
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self { store }
    }

    /// Assigns a new active representative for a course. Any previously
    /// active assignment for the course is deactivated first (never
    /// deleted), preserving the at-most-one-active invariant.
    pub async fn assign_representative(
        &self,
        actor: &ActorContext,
        payload: AssignRepresentativePayload,
    ) -> AppResult<RepresentativeAssignment> {
        if !matches!(actor.role, ActorRole::Lecturer | ActorRole::Admin) {
            return Err(AppError::forbidden(
                "only lecturers or admins can assign a course representative",
            ));
        }
        payload.validate()?;

        if let Some(current) = self
            .store
            .find_active_assignment(&payload.course_code)
            .await?
        {
            self.store.deactivate_assignment(&current.id).await?;
            tracing::info!(
                course_code = %payload.course_code,
                superseded = %current.representative_user_id,
                "Deactivated previous representative assignment"
            );
        }

        let assignment = RepresentativeAssignment {
            id: Uuid::new_v4().to_string(),
            course_code: payload.course_code,
            course_name: payload.course_name,
            representative_user_id: payload.representative_user_id,
            representative_name: payload.representative_name,
            assigned_by_user_id: actor.user_id.clone(),
            assigned_at: Utc::now(),
            is_active: true,
            permissions: payload.permissions,
            contact_methods: payload.contact_methods,
            version: 0,
        };
        self.store.insert_assignment(&assignment).await?;

        tracing::info!(
            course_code = %assignment.course_code,
            representative = %assignment.representative_user_id,
            assigned_by = %actor.user_id,
            "Representative assigned"
        );

        Ok(assignment)
    }

    pub async fn active_representative(
        &self,
        course_code: &str,
    ) -> AppResult<Option<RepresentativeAssignment>> {
        self.store.find_active_assignment(course_code).await
    }

    /// Courses the given user currently represents.
    pub async fn representative_courses(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<RepresentativeAssignment>> {
        self.store.list_active_assignments_for_user(user_id).await
    }

    /// Authorization gate used by the request and announcement services: the
    /// actor must be the current active representative of the course. Checked
    /// before any write, so a Forbidden never leaves a partial mutation.
    pub(crate) async fn require_active_representative(
        &self,
        actor: &ActorContext,
        course_code: &str,
    ) -> AppResult<RepresentativeAssignment> {
        let assignment = self
            .store
            .find_active_assignment(course_code)
            .await?
            .ok_or_else(|| {
                AppError::forbidden(format!("no active representative for course {}", course_code))
            })?;
        if assignment.representative_user_id != actor.user_id {
            return Err(AppError::forbidden(format!(
                "caller is not the active representative for course {}",
                course_code
            )));
        }
        Ok(assignment)
    }
}

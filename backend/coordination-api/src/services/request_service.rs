use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::metrics::{REQUESTS_CREATED_TOTAL, REQUEST_RESPONSES_TOTAL};
use crate::models::{
    ActorContext, CourseRequest, CreateRequestPayload, LecturerResponse, RequestStatus,
    RequestType, RespondToRequestPayload, ResponseDecision,
};
use crate::services::notification_service::{dispatch_request_notifications, NotificationTransport};
use crate::services::registry_service::RegistryService;
use crate::store::{CoordinationStore, COURSE_REP_REQUESTS};
use crate::utils::retry::{retry_conflicts, RetryConfig};

pub struct RequestService {
    store: Arc<dyn CoordinationStore>,
    notifier: Arc<dyn NotificationTransport>,
    retry: RetryConfig,
}

impl RequestService {
    pub fn new(store: Arc<dyn CoordinationStore>, notifier: Arc<dyn NotificationTransport>) -> Self {
        Self {
            store,
            notifier,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Creates a pending assignment/quiz request. The caller must be the
    /// active representative of the course and hold the per-type permission
    /// flag. Notification events for the target lecturers are dispatched
    /// after the insert commits, fire-and-forget.
    pub async fn create_request(
        &self,
        actor: &ActorContext,
        payload: CreateRequestPayload,
    ) -> AppResult<CourseRequest> {
        payload.validate()?;
        validate_detail_block(&payload)?;

        let registry = RegistryService::new(self.store.clone());
        let assignment = registry
            .require_active_representative(actor, &payload.course_code)
            .await?;

        let permitted = match payload.request_type {
            RequestType::Assignment => assignment.permissions.create_assignment_requests,
            RequestType::Quiz => assignment.permissions.create_quiz_requests,
        };
        if !permitted {
            return Err(AppError::forbidden(format!(
                "representative lacks permission to create {} requests",
                payload.request_type.as_str()
            )));
        }

        let now = Utc::now();
        let request = CourseRequest {
            id: Uuid::new_v4().to_string(),
            request_type: payload.request_type,
            course_code: payload.course_code,
            course_name: payload.course_name,
            requested_by_user_id: actor.user_id.clone(),
            requested_by_name: actor.name.clone(),
            target_lecturer_ids: payload.target_lecturer_ids,
            status: RequestStatus::Pending,
            priority: payload.priority,
            title: payload.title,
            description: payload.description,
            reason_for_request: payload.reason_for_request,
            created_at: now,
            updated_at: now,
            responses: HashMap::new(),
            approval_count: 0,
            rejection_count: 0,
            assignment: payload.assignment,
            quiz: payload.quiz,
            version: 0,
        };
        self.store.insert_request(&request).await?;

        REQUESTS_CREATED_TOTAL
            .with_label_values(&[request.request_type.as_str()])
            .inc();
        tracing::info!(
            request_id = %request.id,
            course_code = %request.course_code,
            targets = request.target_lecturer_ids.len(),
            "Request created: {}",
            request.request_type.as_str()
        );

        dispatch_request_notifications(self.notifier.clone(), &request);

        Ok(request)
    }

    /// Records (or overwrites) the calling lecturer's decision and derives
    /// the aggregate status from the full responses map.
    ///
    /// This is the concurrency-critical path: the whole read-merge-write runs
    /// under a conditional write on the document version, so two lecturers
    /// responding simultaneously cannot drop each other's vote — the loser of
    /// the race re-reads and merges onto the winner's document.
    pub async fn respond_to_request(
        &self,
        actor: &ActorContext,
        request_id: &str,
        payload: RespondToRequestPayload,
    ) -> AppResult<CourseRequest> {
        let updated = retry_conflicts(self.retry.clone(), COURSE_REP_REQUESTS, || async {
            let mut request = self
                .store
                .get_request(request_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("request {} not found", request_id)))?;

            if !request
                .target_lecturer_ids
                .iter()
                .any(|id| id == &actor.user_id)
            {
                return Err(AppError::forbidden(
                    "caller is not a target lecturer of this request",
                ));
            }

            // Keyed by lecturer id: a second response replaces the first.
            request.responses.insert(
                actor.user_id.clone(),
                LecturerResponse {
                    decision: payload.decision,
                    comments: payload.comments.clone(),
                    responded_at: Utc::now(),
                    lecturer_name: actor.name.clone(),
                },
            );
            request.recompute_status();
            request.updated_at = Utc::now();

            self.store
                .replace_request(request.version, &request)
                .await?;
            request.version += 1;
            Ok(request)
        })
        .await?;

        let decision_label = match payload.decision {
            ResponseDecision::Approved => "approved",
            ResponseDecision::Rejected => "rejected",
        };
        REQUEST_RESPONSES_TOTAL
            .with_label_values(&[decision_label])
            .inc();
        tracing::info!(
            request_id = %updated.id,
            lecturer_id = %actor.user_id,
            decision = decision_label,
            status = ?updated.status,
            "Response recorded"
        );

        Ok(updated)
    }

    /// Representative's own view, newest first.
    pub async fn list_by_requester(&self, user_id: &str) -> AppResult<Vec<CourseRequest>> {
        self.store.list_requests_by_requester(user_id).await
    }

    /// Lecturer's inbox view, newest first.
    pub async fn list_by_lecturer(&self, lecturer_id: &str) -> AppResult<Vec<CourseRequest>> {
        self.store.list_requests_by_lecturer(lecturer_id).await
    }
}

fn validate_detail_block(payload: &CreateRequestPayload) -> AppResult<()> {
    match payload.request_type {
        RequestType::Assignment if payload.quiz.is_some() => Err(AppError::Validation(
            "assignment request must not carry a quiz detail block".to_string(),
        )),
        RequestType::Quiz if payload.assignment.is_some() => Err(AppError::Validation(
            "quiz request must not carry an assignment detail block".to_string(),
        )),
        _ => Ok(()),
    }
}

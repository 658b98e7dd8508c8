use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::metrics::ANNOUNCEMENTS_SENT_TOTAL;
use crate::models::{ActorContext, Announcement, SendAnnouncementPayload};
use crate::services::registry_service::RegistryService;
use crate::store::{CoordinationStore, COURSE_ANNOUNCEMENTS};
use crate::utils::retry::{retry_conflicts, RetryConfig};

pub struct AnnouncementService {
    store: Arc<dyn CoordinationStore>,
    retry: RetryConfig,
}

impl AnnouncementService {
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self {
            store,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Broadcasts a course announcement. Caller must be the active
    /// representative with the sendAnnouncements permission.
    pub async fn send_announcement(
        &self,
        actor: &ActorContext,
        payload: SendAnnouncementPayload,
    ) -> AppResult<Announcement> {
        payload.validate()?;

        let registry = RegistryService::new(self.store.clone());
        let assignment = registry
            .require_active_representative(actor, &payload.course_code)
            .await?;
        if !assignment.permissions.send_announcements {
            return Err(AppError::forbidden(
                "representative lacks permission to send announcements",
            ));
        }

        let announcement = Announcement {
            id: Uuid::new_v4().to_string(),
            course_code: payload.course_code,
            course_name: payload.course_name,
            sent_by_user_id: actor.user_id.clone(),
            sent_by_name: actor.name.clone(),
            title: payload.title,
            message: payload.message,
            announcement_type: payload.announcement_type,
            priority: payload.priority,
            target_audience: payload.target_audience,
            created_at: Utc::now(),
            expires_at: payload.expires_at,
            is_active: true,
            views: HashMap::new(),
            view_count: 0,
            acknowledged_by: HashMap::new(),
            acknowledgment_count: 0,
            version: 0,
        };
        self.store.insert_announcement(&announcement).await?;

        ANNOUNCEMENTS_SENT_TOTAL
            .with_label_values(&[announcement.announcement_type.as_str()])
            .inc();
        tracing::info!(
            announcement_id = %announcement.id,
            course_code = %announcement.course_code,
            "Announcement sent"
        );

        Ok(announcement)
    }

    /// Idempotently records that `user_id` viewed the announcement. Viewing
    /// twice leaves `viewCount` unchanged after the first call.
    pub async fn record_view(&self, announcement_id: &str, user_id: &str) -> AppResult<Announcement> {
        retry_conflicts(self.retry.clone(), COURSE_ANNOUNCEMENTS, || async {
            let mut announcement = self.fetch(announcement_id).await?;
            if announcement.views.contains_key(user_id) {
                return Ok(announcement);
            }
            announcement.views.insert(user_id.to_string(), Utc::now());
            announcement.recompute_counts();
            self.store
                .replace_announcement(announcement.version, &announcement)
                .await?;
            announcement.version += 1;
            Ok(announcement)
        })
        .await
    }

    /// Same idempotency contract as `record_view`, for acknowledgments.
    pub async fn record_acknowledgment(
        &self,
        announcement_id: &str,
        user_id: &str,
    ) -> AppResult<Announcement> {
        retry_conflicts(self.retry.clone(), COURSE_ANNOUNCEMENTS, || async {
            let mut announcement = self.fetch(announcement_id).await?;
            if announcement.acknowledged_by.contains_key(user_id) {
                return Ok(announcement);
            }
            announcement
                .acknowledged_by
                .insert(user_id.to_string(), Utc::now());
            announcement.recompute_counts();
            self.store
                .replace_announcement(announcement.version, &announcement)
                .await?;
            announcement.version += 1;
            Ok(announcement)
        })
        .await
    }

    /// Active, unexpired announcements for a course, newest first.
    pub async fn list_announcements(
        &self,
        course_code: &str,
        limit: i64,
    ) -> AppResult<Vec<Announcement>> {
        self.store
            .list_active_announcements(course_code, limit)
            .await
    }

    async fn fetch(&self, announcement_id: &str) -> AppResult<Announcement> {
        self.store
            .get_announcement(announcement_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("announcement {} not found", announcement_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ActorRole, AnnouncementType, AssignRepresentativePayload, RepresentativePermissions,
        RequestPriority, TargetAudience,
    };
    use crate::store::MemoryStore;

    fn rep_actor() -> ActorContext {
        ActorContext {
            user_id: "rep-1".to_string(),
            name: "Rita Rep".to_string(),
            role: ActorRole::Student,
        }
    }

    fn payload(title: &str) -> SendAnnouncementPayload {
        SendAnnouncementPayload {
            course_code: "CS101".to_string(),
            course_name: "Intro to CS".to_string(),
            title: title.to_string(),
            message: "Lecture hall changed to B204".to_string(),
            announcement_type: AnnouncementType::Update,
            priority: RequestPriority::Normal,
            target_audience: TargetAudience::Students,
            expires_at: None,
        }
    }

    async fn setup() -> (Arc<MemoryStore>, AnnouncementService) {
        let store = Arc::new(MemoryStore::new());
        let registry = RegistryService::new(store.clone());
        let assigner = ActorContext {
            user_id: "lect-0".to_string(),
            name: "Dr. Assigner".to_string(),
            role: ActorRole::Lecturer,
        };
        registry
            .assign_representative(
                &assigner,
                AssignRepresentativePayload {
                    course_code: "CS101".to_string(),
                    course_name: "Intro to CS".to_string(),
                    representative_user_id: "rep-1".to_string(),
                    representative_name: "Rita Rep".to_string(),
                    permissions: RepresentativePermissions::standard(),
                    contact_methods: vec![],
                },
            )
            .await
            .unwrap();
        let service = AnnouncementService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn views_are_idempotent_per_user() {
        let (_store, service) = setup().await;
        let announcement = service
            .send_announcement(&rep_actor(), payload("Room change"))
            .await
            .unwrap();

        for user in ["s1", "s2", "s3"] {
            service.record_view(&announcement.id, user).await.unwrap();
        }
        let after_repeat = service.record_view(&announcement.id, "s1").await.unwrap();

        assert_eq!(after_repeat.view_count, 3);
        assert_eq!(after_repeat.views.len(), 3);
    }

    #[tokio::test]
    async fn acknowledgments_are_idempotent_per_user() {
        let (_store, service) = setup().await;
        let announcement = service
            .send_announcement(&rep_actor(), payload("Deadline reminder"))
            .await
            .unwrap();

        service
            .record_acknowledgment(&announcement.id, "s1")
            .await
            .unwrap();
        let after_repeat = service
            .record_acknowledgment(&announcement.id, "s1")
            .await
            .unwrap();

        assert_eq!(after_repeat.acknowledgment_count, 1);
        // Views stay untouched by acks.
        assert_eq!(after_repeat.view_count, 0);
    }

    #[tokio::test]
    async fn concurrent_views_from_distinct_users_all_count() {
        let (store, _) = setup().await;
        let service = Arc::new(
            AnnouncementService::new(store.clone() as Arc<dyn CoordinationStore>).with_retry(
                RetryConfig {
                    max_attempts: 50,
                    base_backoff: std::time::Duration::from_millis(1),
                    max_backoff: std::time::Duration::from_millis(10),
                    jitter_max: Some(std::time::Duration::from_millis(2)),
                },
            ),
        );
        let announcement = service
            .send_announcement(&rep_actor(), payload("All hands"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let service = service.clone();
            let id = announcement.id.clone();
            handles.push(tokio::spawn(async move {
                service.record_view(&id, &format!("student-{}", i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store.get_announcement(&announcement.id).await.unwrap().unwrap();
        assert_eq!(stored.view_count, 10);
        assert_eq!(stored.views.len(), 10);
    }

    #[tokio::test]
    async fn non_representative_cannot_send() {
        let (_store, service) = setup().await;
        let outsider = ActorContext {
            user_id: "s9".to_string(),
            name: "Random Student".to_string(),
            role: ActorRole::Student,
        };
        let res = service.send_announcement(&outsider, payload("Hello")).await;
        assert!(matches!(res, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn listing_skips_expired_and_orders_newest_first() {
        let (_store, service) = setup().await;

        let mut expired = payload("Old news");
        expired.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        service
            .send_announcement(&rep_actor(), expired)
            .await
            .unwrap();

        service
            .send_announcement(&rep_actor(), payload("First"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service
            .send_announcement(&rep_actor(), payload("Second"))
            .await
            .unwrap();

        let listed = service.list_announcements("CS101", 20).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "Second");
        assert_eq!(listed[1].title, "First");
    }
}

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;

use crate::errors::{AppError, AppResult};
use crate::models::{Announcement, CourseRequest, RepresentativeAssignment};

use super::{ChangeEvent, CoordinationStore, COURSE_REP_REQUESTS};

const CHANGE_FEED_CAPACITY: usize = 256;

/// In-process store backend with the same version discipline as the MongoDB
/// backend. Used by the test suite and the `memory` store backend for local
/// development.
pub struct MemoryStore {
    assignments: RwLock<HashMap<String, RepresentativeAssignment>>,
    requests: RwLock<HashMap<String, CourseRequest>>,
    announcements: RwLock<HashMap<String, Announcement>>,
    request_events: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (request_events, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            assignments: RwLock::new(HashMap::new()),
            requests: RwLock::new(HashMap::new()),
            announcements: RwLock::new(HashMap::new()),
            request_events,
        }
    }

    fn publish_request_event(&self, document_id: &str) {
        // No receivers is fine; nobody is subscribed.
        let _ = self.request_events.send(ChangeEvent {
            collection: COURSE_REP_REQUESTS,
            document_id: document_id.to_string(),
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn insert_assignment(&self, assignment: &RepresentativeAssignment) -> AppResult<()> {
        let mut assignments = self.assignments.write().expect("assignments lock poisoned");
        assignments.insert(assignment.id.clone(), assignment.clone());
        Ok(())
    }

    async fn find_active_assignment(
        &self,
        course_code: &str,
    ) -> AppResult<Option<RepresentativeAssignment>> {
        let assignments = self.assignments.read().expect("assignments lock poisoned");
        Ok(assignments
            .values()
            .find(|a| a.is_active && a.course_code == course_code)
            .cloned())
    }

    async fn deactivate_assignment(&self, id: &str) -> AppResult<()> {
        let mut assignments = self.assignments.write().expect("assignments lock poisoned");
        if let Some(assignment) = assignments.get_mut(id) {
            assignment.is_active = false;
            assignment.version += 1;
        }
        Ok(())
    }

    async fn list_active_assignments_for_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<RepresentativeAssignment>> {
        let assignments = self.assignments.read().expect("assignments lock poisoned");
        let mut result: Vec<_> = assignments
            .values()
            .filter(|a| a.is_active && a.representative_user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));
        Ok(result)
    }

    async fn insert_request(&self, request: &CourseRequest) -> AppResult<()> {
        {
            let mut requests = self.requests.write().expect("requests lock poisoned");
            requests.insert(request.id.clone(), request.clone());
        }
        self.publish_request_event(&request.id);
        Ok(())
    }

    async fn get_request(&self, id: &str) -> AppResult<Option<CourseRequest>> {
        let requests = self.requests.read().expect("requests lock poisoned");
        Ok(requests.get(id).cloned())
    }

    async fn replace_request(
        &self,
        expected_version: i64,
        request: &CourseRequest,
    ) -> AppResult<()> {
        {
            let mut requests = self.requests.write().expect("requests lock poisoned");
            let current = requests
                .get_mut(&request.id)
                .ok_or(AppError::VersionConflict)?;
            if current.version != expected_version {
                return Err(AppError::VersionConflict);
            }
            let mut next = request.clone();
            next.version = expected_version + 1;
            *current = next;
        }
        self.publish_request_event(&request.id);
        Ok(())
    }

    async fn list_requests_by_requester(&self, user_id: &str) -> AppResult<Vec<CourseRequest>> {
        let requests = self.requests.read().expect("requests lock poisoned");
        let mut result: Vec<_> = requests
            .values()
            .filter(|r| r.requested_by_user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_requests_by_lecturer(&self, lecturer_id: &str) -> AppResult<Vec<CourseRequest>> {
        let requests = self.requests.read().expect("requests lock poisoned");
        let mut result: Vec<_> = requests
            .values()
            .filter(|r| r.target_lecturer_ids.iter().any(|id| id == lecturer_id))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn insert_announcement(&self, announcement: &Announcement) -> AppResult<()> {
        let mut announcements = self
            .announcements
            .write()
            .expect("announcements lock poisoned");
        announcements.insert(announcement.id.clone(), announcement.clone());
        Ok(())
    }

    async fn get_announcement(&self, id: &str) -> AppResult<Option<Announcement>> {
        let announcements = self
            .announcements
            .read()
            .expect("announcements lock poisoned");
        Ok(announcements.get(id).cloned())
    }

    async fn replace_announcement(
        &self,
        expected_version: i64,
        announcement: &Announcement,
    ) -> AppResult<()> {
        let mut announcements = self
            .announcements
            .write()
            .expect("announcements lock poisoned");
        let current = announcements
            .get_mut(&announcement.id)
            .ok_or(AppError::VersionConflict)?;
        if current.version != expected_version {
            return Err(AppError::VersionConflict);
        }
        let mut next = announcement.clone();
        next.version = expected_version + 1;
        *current = next;
        Ok(())
    }

    async fn list_active_announcements(
        &self,
        course_code: &str,
        limit: i64,
    ) -> AppResult<Vec<Announcement>> {
        let now = Utc::now();
        let announcements = self
            .announcements
            .read()
            .expect("announcements lock poisoned");
        let mut result: Vec<_> = announcements
            .values()
            .filter(|a| {
                a.is_active
                    && a.course_code == course_code
                    && a.expires_at.map(|exp| exp > now).unwrap_or(true)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit.max(0) as usize);
        Ok(result)
    }

    fn watch_requests(&self) -> broadcast::Receiver<ChangeEvent> {
        self.request_events.subscribe()
    }
}

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::errors::AppResult;
use crate::models::{Announcement, CourseRequest, RepresentativeAssignment};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub const REPRESENTATIVE_ASSIGNMENTS: &str = "representativeAssignments";
pub const COURSE_REP_REQUESTS: &str = "courseRepRequests";
pub const COURSE_ANNOUNCEMENTS: &str = "courseAnnouncements";

/// Emitted on the change feed after a write has been durably committed.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub collection: &'static str,
    pub document_id: String,
}

/// Persistence seam of the engine. The engine holds no durable state of its
/// own; every mutation is read-current / derive-next / write-next against
/// this store.
///
/// Conditional replaces implement optimistic concurrency: the write succeeds
/// only if the stored document still carries `expected_version`, in which
/// case the replacement is persisted with `expected_version + 1`. A mismatch
/// returns `AppError::VersionConflict` without writing anything; callers
/// re-read and retry.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    async fn ping(&self) -> AppResult<()>;

    async fn insert_assignment(&self, assignment: &RepresentativeAssignment) -> AppResult<()>;
    async fn find_active_assignment(
        &self,
        course_code: &str,
    ) -> AppResult<Option<RepresentativeAssignment>>;
    async fn deactivate_assignment(&self, id: &str) -> AppResult<()>;
    async fn list_active_assignments_for_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<RepresentativeAssignment>>;

    async fn insert_request(&self, request: &CourseRequest) -> AppResult<()>;
    async fn get_request(&self, id: &str) -> AppResult<Option<CourseRequest>>;
    async fn replace_request(
        &self,
        expected_version: i64,
        request: &CourseRequest,
    ) -> AppResult<()>;
    /// Ordered by createdAt descending.
    async fn list_requests_by_requester(&self, user_id: &str) -> AppResult<Vec<CourseRequest>>;
    /// Ordered by createdAt descending.
    async fn list_requests_by_lecturer(&self, lecturer_id: &str) -> AppResult<Vec<CourseRequest>>;

    async fn insert_announcement(&self, announcement: &Announcement) -> AppResult<()>;
    async fn get_announcement(&self, id: &str) -> AppResult<Option<Announcement>>;
    async fn replace_announcement(
        &self,
        expected_version: i64,
        announcement: &Announcement,
    ) -> AppResult<()>;
    /// Active, unexpired announcements for a course, createdAt descending.
    async fn list_active_announcements(
        &self,
        course_code: &str,
        limit: i64,
    ) -> AppResult<Vec<Announcement>>;

    /// Change feed over the request collection. Events are published after
    /// the corresponding write committed, in commit order.
    fn watch_requests(&self) -> broadcast::Receiver<ChangeEvent>;
}

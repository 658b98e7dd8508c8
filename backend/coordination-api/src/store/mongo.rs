use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use tokio::sync::broadcast;

use crate::errors::{AppError, AppResult};
use crate::models::{Announcement, CourseRequest, RepresentativeAssignment};
use crate::utils::time::chrono_to_bson;

use super::{
    ChangeEvent, CoordinationStore, COURSE_ANNOUNCEMENTS, COURSE_REP_REQUESTS,
    REPRESENTATIVE_ASSIGNMENTS,
};

const CHANGE_FEED_CAPACITY: usize = 256;

/// MongoDB store backend. One document per entity; conditional replaces
/// filter on `{_id, version}` and write the document back with the version
/// incremented, so a concurrent writer that read the same version loses the
/// race and gets `VersionConflict` instead of silently overwriting.
///
/// Change events are published in-process after each committed request
/// write. All request writes are mediated by this process, which keeps the
/// feed consistent with commit order without requiring a replica set for
/// MongoDB change streams.
pub struct MongoStore {
    db: Database,
    request_events: broadcast::Sender<ChangeEvent>,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        let (request_events, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { db, request_events }
    }

    fn assignments(&self) -> Collection<RepresentativeAssignment> {
        self.db.collection(REPRESENTATIVE_ASSIGNMENTS)
    }

    fn requests(&self) -> Collection<CourseRequest> {
        self.db.collection(COURSE_REP_REQUESTS)
    }

    fn announcements(&self) -> Collection<Announcement> {
        self.db.collection(COURSE_ANNOUNCEMENTS)
    }

    fn publish_request_event(&self, document_id: &str) {
        let _ = self.request_events.send(ChangeEvent {
            collection: COURSE_REP_REQUESTS,
            document_id: document_id.to_string(),
        });
    }
}

#[async_trait]
impl CoordinationStore for MongoStore {
    async fn ping(&self) -> AppResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn insert_assignment(&self, assignment: &RepresentativeAssignment) -> AppResult<()> {
        self.assignments().insert_one(assignment).await?;
        Ok(())
    }

    async fn find_active_assignment(
        &self,
        course_code: &str,
    ) -> AppResult<Option<RepresentativeAssignment>> {
        let found = self
            .assignments()
            .find_one(doc! { "courseCode": course_code, "isActive": true })
            .await?;
        Ok(found)
    }

    async fn deactivate_assignment(&self, id: &str) -> AppResult<()> {
        self.assignments()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "isActive": false }, "$inc": { "version": 1 } },
            )
            .await?;
        Ok(())
    }

    async fn list_active_assignments_for_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<RepresentativeAssignment>> {
        let options = FindOptions::builder()
            .sort(doc! { "assignedAt": -1 })
            .build();
        let cursor = self
            .assignments()
            .find(doc! { "representativeUserId": user_id, "isActive": true })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_request(&self, request: &CourseRequest) -> AppResult<()> {
        self.requests().insert_one(request).await?;
        self.publish_request_event(&request.id);
        Ok(())
    }

    async fn get_request(&self, id: &str) -> AppResult<Option<CourseRequest>> {
        Ok(self.requests().find_one(doc! { "_id": id }).await?)
    }

    async fn replace_request(
        &self,
        expected_version: i64,
        request: &CourseRequest,
    ) -> AppResult<()> {
        let mut next = request.clone();
        next.version = expected_version + 1;
        let result = self
            .requests()
            .replace_one(doc! { "_id": &request.id, "version": expected_version }, &next)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::VersionConflict);
        }
        self.publish_request_event(&request.id);
        Ok(())
    }

    async fn list_requests_by_requester(&self, user_id: &str) -> AppResult<Vec<CourseRequest>> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();
        let cursor = self
            .requests()
            .find(doc! { "requestedByUserId": user_id })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_requests_by_lecturer(&self, lecturer_id: &str) -> AppResult<Vec<CourseRequest>> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();
        // Array-contains match on the target set.
        let cursor = self
            .requests()
            .find(doc! { "targetLecturerIds": lecturer_id })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_announcement(&self, announcement: &Announcement) -> AppResult<()> {
        self.announcements().insert_one(announcement).await?;
        Ok(())
    }

    async fn get_announcement(&self, id: &str) -> AppResult<Option<Announcement>> {
        Ok(self.announcements().find_one(doc! { "_id": id }).await?)
    }

    async fn replace_announcement(
        &self,
        expected_version: i64,
        announcement: &Announcement,
    ) -> AppResult<()> {
        let mut next = announcement.clone();
        next.version = expected_version + 1;
        let result = self
            .announcements()
            .replace_one(
                doc! { "_id": &announcement.id, "version": expected_version },
                &next,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::VersionConflict);
        }
        Ok(())
    }

    async fn list_active_announcements(
        &self,
        course_code: &str,
        limit: i64,
    ) -> AppResult<Vec<Announcement>> {
        let now = chrono_to_bson(Utc::now());
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .limit(limit)
            .build();
        // expiresAt is omitted (not null) for announcements without expiry.
        let cursor = self
            .announcements()
            .find(doc! {
                "courseCode": course_code,
                "isActive": true,
                "$or": [
                    { "expiresAt": { "$exists": false } },
                    { "expiresAt": null },
                    { "expiresAt": { "$gt": now } },
                ],
            })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    fn watch_requests(&self) -> broadcast::Receiver<ChangeEvent> {
        self.request_events.subscribe()
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::time::{
    bson_datetime_as_chrono, bson_datetime_as_chrono_option, bson_datetime_map_as_chrono,
};

use super::request::RequestPriority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementType {
    General,
    Urgent,
    Reminder,
    Update,
}

impl AnnouncementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnouncementType::General => "general",
            AnnouncementType::Urgent => "urgent",
            AnnouncementType::Reminder => "reminder",
            AnnouncementType::Update => "update",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetAudience {
    All,
    Students,
    Lecturers,
}

/// Course-scoped broadcast stored in the "courseAnnouncements" collection.
///
/// `viewCount` and `acknowledgmentCount` are derived from the maps and are
/// recomputed on every view/ack event rather than incremented, so they can
/// never drift from the map sizes. Announcements are soft-expired via
/// `isActive`/`expiresAt` and never hard-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(rename = "_id")]
    pub id: String,
    pub course_code: String,
    pub course_name: String,
    pub sent_by_user_id: String,
    pub sent_by_name: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub announcement_type: AnnouncementType,
    pub priority: RequestPriority,
    pub target_audience: TargetAudience,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "bson_datetime_as_chrono_option", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(default, with = "bson_datetime_map_as_chrono")]
    pub views: HashMap<String, DateTime<Utc>>,
    pub view_count: u32,
    #[serde(default, with = "bson_datetime_map_as_chrono")]
    pub acknowledged_by: HashMap<String, DateTime<Utc>>,
    pub acknowledgment_count: u32,
    #[serde(default)]
    pub version: i64,
}

impl Announcement {
    /// Recomputes both derived counters from the maps.
    pub fn recompute_counts(&mut self) {
        self.view_count = self.views.len() as u32;
        self.acknowledgment_count = self.acknowledged_by.len() as u32;
    }
}

fn default_announcement_type() -> AnnouncementType {
    AnnouncementType::General
}

fn default_priority() -> RequestPriority {
    RequestPriority::Normal
}

fn default_audience() -> TargetAudience {
    TargetAudience::All
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendAnnouncementPayload {
    #[validate(length(min = 1, message = "course code is required"))]
    pub course_code: String,
    #[validate(length(min = 1, message = "course name is required"))]
    pub course_name: String,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    #[serde(rename = "type", default = "default_announcement_type")]
    pub announcement_type: AnnouncementType,
    #[serde(default = "default_priority")]
    pub priority: RequestPriority,
    #[serde(default = "default_audience")]
    pub target_audience: TargetAudience,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::Bson;

    fn announcement_with_view() -> Announcement {
        let now = Utc::now();
        let mut views = HashMap::new();
        views.insert("s1".to_string(), now);
        Announcement {
            id: "a1".to_string(),
            course_code: "CS101".to_string(),
            course_name: "Intro to CS".to_string(),
            sent_by_user_id: "rep-1".to_string(),
            sent_by_name: "Rita Rep".to_string(),
            title: "Room change".to_string(),
            message: "B204".to_string(),
            announcement_type: AnnouncementType::Update,
            priority: RequestPriority::Normal,
            target_audience: TargetAudience::Students,
            created_at: now,
            expires_at: None,
            is_active: true,
            views,
            view_count: 1,
            acknowledged_by: HashMap::new(),
            acknowledgment_count: 0,
            version: 0,
        }
    }

    #[test]
    fn view_timestamps_persist_as_bson_dates() {
        let bson = mongodb::bson::to_bson(&announcement_with_view()).unwrap();
        let doc = bson.as_document().unwrap();
        let views = doc.get("views").unwrap().as_document().unwrap();
        assert!(matches!(views.get("s1"), Some(Bson::DateTime(_))));
        assert!(matches!(doc.get("createdAt"), Some(Bson::DateTime(_))));
    }

    #[test]
    fn view_map_round_trips_through_bson() {
        let original = announcement_with_view();
        let bson = mongodb::bson::to_bson(&original).unwrap();
        let restored: Announcement = mongodb::bson::from_bson(bson).unwrap();
        assert_eq!(restored.views.len(), 1);
        assert!(restored.views.contains_key("s1"));
        // Millisecond truncation is the store's persisted precision.
        assert_eq!(
            restored.views["s1"].timestamp_millis(),
            original.views["s1"].timestamp_millis()
        );
    }
}

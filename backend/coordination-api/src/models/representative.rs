use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::time::bson_datetime_as_chrono;

/// Active-representative record stored in the "representativeAssignments"
/// collection. At most one document per courseCode has `isActive == true`;
/// reassignment deactivates the previous record instead of deleting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativeAssignment {
    #[serde(rename = "_id")]
    pub id: String,
    pub course_code: String,
    pub course_name: String,
    pub representative_user_id: String,
    pub representative_name: String,
    pub assigned_by_user_id: String,
    #[serde(with = "bson_datetime_as_chrono")]
    pub assigned_at: DateTime<Utc>,
    pub is_active: bool,
    pub permissions: RepresentativePermissions,
    #[serde(default)]
    pub contact_methods: Vec<String>,
    #[serde(default)]
    pub version: i64,
}

/// Capability flags granted to a representative for their course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativePermissions {
    #[serde(default)]
    pub create_assignment_requests: bool,
    #[serde(default)]
    pub create_quiz_requests: bool,
    #[serde(default)]
    pub send_announcements: bool,
    #[serde(default)]
    pub contact_lecturers: bool,
    #[serde(default)]
    pub manage_schedule: bool,
    #[serde(default)]
    pub view_analytics: bool,
}

impl RepresentativePermissions {
    /// Default grant for a newly assigned representative.
    pub fn standard() -> Self {
        Self {
            create_assignment_requests: true,
            create_quiz_requests: true,
            send_announcements: true,
            contact_lecturers: true,
            manage_schedule: false,
            view_analytics: false,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignRepresentativePayload {
    #[validate(length(min = 1, message = "course code is required"))]
    pub course_code: String,
    #[validate(length(min = 1, message = "course name is required"))]
    pub course_name: String,
    #[validate(length(min = 1, message = "representative user id is required"))]
    pub representative_user_id: String,
    #[validate(length(min = 1, message = "representative name is required"))]
    pub representative_name: String,
    #[serde(default = "RepresentativePermissions::standard")]
    pub permissions: RepresentativePermissions,
    #[serde(default)]
    pub contact_methods: Vec<String>,
}

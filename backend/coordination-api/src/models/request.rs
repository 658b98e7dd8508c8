use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::time::{bson_datetime_as_chrono, bson_datetime_as_chrono_option};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Assignment,
    Quiz,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Assignment => "assignment",
            RequestType::Quiz => "quiz",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPriority {
    Low,
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseDecision {
    Approved,
    Rejected,
}

/// A single lecturer's decision, embedded in `CourseRequest.responses` keyed
/// by lecturer id. A later response from the same lecturer replaces this
/// entry; a lecturer never holds more than one live response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LecturerResponse {
    pub decision: ResponseDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub responded_at: DateTime<Utc>,
    pub lecturer_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDetails {
    #[serde(default, with = "bson_datetime_as_chrono_option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_marks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weightage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetails {
    #[serde(default, with = "bson_datetime_as_chrono_option", skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_marks: Option<u32>,
    #[serde(default)]
    pub question_types: Vec<String>,
    /// Ordered list of topics the quiz should cover.
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Assignment/quiz request stored in the "courseRepRequests" collection.
///
/// `approvalCount`, `rejectionCount` and `status` are derived from the
/// `responses` map; `recompute_status` is the only place they are written.
/// Requests are never deleted, only transitioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub course_code: String,
    pub course_name: String,
    pub requested_by_user_id: String,
    pub requested_by_name: String,
    pub target_lecturer_ids: Vec<String>,
    pub status: RequestStatus,
    pub priority: RequestPriority,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_for_request: Option<String>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub responses: HashMap<String, LecturerResponse>,
    pub approval_count: u32,
    pub rejection_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment: Option<AssignmentDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<QuizDetails>,
    #[serde(default)]
    pub version: i64,
}

impl CourseRequest {
    /// Recomputes the counters and the aggregate status from the full
    /// responses map.
    ///
    /// Policy (reproduced as observed in the coordination workflow): any
    /// rejection wins, regardless of how many approvals exist, and the
    /// status is recomputed from scratch after every response. It is
    /// therefore non-monotonic — a late rejection flips an approved request,
    /// and a lecturer revising their decision can flip it back. There is no
    /// terminal state; responses keep being accepted after approval or
    /// rejection.
    pub fn recompute_status(&mut self) {
        let approvals = self
            .responses
            .values()
            .filter(|r| r.decision == ResponseDecision::Approved)
            .count() as u32;
        let rejections = self.responses.len() as u32 - approvals;

        self.approval_count = approvals;
        self.rejection_count = rejections;
        self.status = if rejections > 0 {
            RequestStatus::Rejected
        } else if approvals > 0 {
            RequestStatus::Approved
        } else {
            RequestStatus::Pending
        };
    }
}

fn default_priority() -> RequestPriority {
    RequestPriority::Normal
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestPayload {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    #[validate(length(min = 1, message = "course code is required"))]
    pub course_code: String,
    #[validate(length(min = 1, message = "course name is required"))]
    pub course_name: String,
    #[validate(length(min = 1, message = "at least one target lecturer is required"))]
    pub target_lecturer_ids: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: RequestPriority,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[serde(default)]
    pub reason_for_request: Option<String>,
    #[serde(default)]
    pub assignment: Option<AssignmentDetails>,
    #[serde(default)]
    pub quiz: Option<QuizDetails>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RespondToRequestPayload {
    pub decision: ResponseDecision,
    #[serde(default)]
    pub comments: Option<String>,
}

use serde::{Deserialize, Serialize};

use super::request::{RequestPriority, RequestType};

/// One per-lecturer event emitted when a request is created. Delivery is
/// best-effort; the transport behind it is injectable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestNotification {
    pub request_id: String,
    pub lecturer_id: String,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub course_code: String,
    pub title: String,
    pub requested_by_name: String,
    pub priority: RequestPriority,
}

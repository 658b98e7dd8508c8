use serde::{Deserialize, Serialize};

/// Identity of the caller for a single operation, materialized by the auth
/// middleware from the bearer token. Always passed explicitly — the engine
/// holds no ambient "current user" state, so one process can serve many
/// concurrent actors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorContext {
    pub user_id: String,
    pub name: String,
    pub role: ActorRole,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Student,
    Lecturer,
    Admin,
}

impl ActorRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(ActorRole::Student),
            "lecturer" => Some(ActorRole::Lecturer),
            "admin" => Some(ActorRole::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Student => "student",
            ActorRole::Lecturer => "lecturer",
            ActorRole::Admin => "admin",
        }
    }
}

pub mod announcement;
pub mod notification;
pub mod representative;
pub mod request;

pub use announcement::{
    Announcement, AnnouncementType, SendAnnouncementPayload, TargetAudience,
};
pub use notification::RequestNotification;
pub use representative::{
    AssignRepresentativePayload, RepresentativeAssignment, RepresentativePermissions,
};
pub use request::{
    AssignmentDetails, CourseRequest, CreateRequestPayload, LecturerResponse, QuizDetails,
    RequestPriority, RequestStatus, RequestType, RespondToRequestPayload, ResponseDecision,
};

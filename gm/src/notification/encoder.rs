//! Notification payloads

use serde::{Deserialize, Serialize};

use crate::event::EventKind;

/// A notification about new activity in a watched repository
///
/// Serialized as `{"repository", "package", "event", "id"}`; push
/// notifications carry no `id` because pushes are reported as a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub repository: String,
    pub package: String,
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Notification {
    pub fn pull_request(package: &str, repository: &str, id: i64) -> Self {
        Self::with_id(package, repository, EventKind::PullRequest, Some(id))
    }

    pub fn issue(package: &str, repository: &str, id: i64) -> Self {
        Self::with_id(package, repository, EventKind::Issue, Some(id))
    }

    pub fn push(package: &str, repository: &str) -> Self {
        Self::with_id(package, repository, EventKind::Push, None)
    }

    fn with_id(package: &str, repository: &str, event: EventKind, id: Option<i64>) -> Self {
        Self {
            repository: repository.to_string(),
            package: package.to_string(),
            event,
            id,
        }
    }

    /// Encode as JSON text
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

//! Topic model: a named collaborative subject.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A topic that owns contributions and at most one summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Identifier assigned by the service (or UUIDv7 when created offline).
    pub id: String,
    /// Title shown in lists.
    pub title: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When the topic was created.
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Topic {
    /// Create a topic locally, for when the service cannot be reached.
    pub fn new_local(title: String, description: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            title,
            description,
            created_at: Utc::now(),
        }
    }
}

/// Body of `POST /api/topics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTopic {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `POST /api/topics/{id}/invite`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub emails: Vec<String>,
}

//! Contribution model: one free-text submission attached to a topic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contribution. Append-only; displayed newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// Identifier assigned by the service.
    pub id: String,
    /// Topic this contribution belongs to.
    pub topic_id: String,
    /// The submitted text.
    pub content: String,
    /// When the contribution was created.
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    /// Author, when the service knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor_email: Option<String>,
}

/// Body of `POST /api/topics/{id}/contributions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContribution {
    pub content: String,
}

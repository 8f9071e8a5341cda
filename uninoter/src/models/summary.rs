//! Summary model: the generated report for a topic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a summary came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryOrigin {
    /// Generated by the service.
    #[default]
    Remote,
    /// Synthesized by the client because generation failed.
    Offline,
}

impl SummaryOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for SummaryOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The current report for a topic. Each generation replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Topic the report covers.
    pub topic_id: String,
    /// Report body (markdown).
    pub content: String,
    /// When the report was generated.
    #[serde(with = "super::timestamp")]
    pub generated_at: DateTime<Utc>,
    /// Remote unless synthesized offline; the service never sends it.
    #[serde(default)]
    pub origin: SummaryOrigin,
}

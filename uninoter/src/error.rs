//! Error types shared by the view-models.

/// Failure talking to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, timeout).
    #[error("could not reach the service: {0}")]
    Transport(String),
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    /// Any other non-success status.
    #[error("service returned status {0}")]
    Status(u16),
    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the backend could not be reached at all.
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Failure reading or writing the local store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("local store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("local store held invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error surfaced by a view-model operation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already exists")]
    EmailExists,
    #[error("failed to create account")]
    AccountCreationFailed,
    #[error("topic title is empty")]
    EmptyTitle,
    #[error("no valid emails")]
    NoValidEmails,
    #[error("no contributions")]
    NoContributions,
    #[error("no topic is loaded")]
    TopicNotLoaded,
    /// The service answered with a record belonging to another topic.
    #[error("service returned a contribution for topic {0}")]
    TopicMismatch(String),
    #[error(transparent)]
    Remote(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ClientResult<T> = Result<T, ClientError>;

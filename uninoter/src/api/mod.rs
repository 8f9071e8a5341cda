//! The remote service contract.
//!
//! View-models only see [`RemoteService`]; [`HttpApi`] is the reqwest
//! implementation used by the CLI.

mod http;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{AuthResponse, Contribution, Credentials, NewTopic, Summary, Topic};

pub use http::HttpApi;

pub type ApiResult<T> = Result<T, ApiError>;

#[async_trait]
pub trait RemoteService: Send + Sync {
    // --- Auth ---
    async fn sign_in(&self, credentials: &Credentials) -> ApiResult<AuthResponse>;

    async fn create_account(&self, credentials: &Credentials) -> ApiResult<AuthResponse>;

    // --- Topics ---
    async fn list_topics(&self) -> ApiResult<Vec<Topic>>;

    async fn create_topic(&self, topic: &NewTopic) -> ApiResult<Topic>;

    async fn get_topic(&self, topic_id: &str) -> ApiResult<Topic>;

    // --- Contributions ---
    async fn list_contributions(&self, topic_id: &str) -> ApiResult<Vec<Contribution>>;

    async fn create_contribution(&self, topic_id: &str, content: &str)
        -> ApiResult<Contribution>;

    // --- Reports ---
    /// `Ok(None)` when the topic has no report yet.
    async fn get_summary(&self, topic_id: &str) -> ApiResult<Option<Summary>>;

    async fn generate_summary(&self, topic_id: &str) -> ApiResult<Summary>;

    // --- Invitations ---
    async fn invite(&self, topic_id: &str, emails: &[String]) -> ApiResult<()>;
}

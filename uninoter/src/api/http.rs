//! reqwest-backed [`RemoteService`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ApiResult, RemoteService};
use crate::error::ApiError;
use crate::models::{
    AuthResponse, Contribution, Credentials, Invitation, NewContribution, NewTopic, Summary, Topic,
};

/// HTTP client for the UniNoter API.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpApi {
    /// Create a client rooted at `base_url`, sending `token` as a bearer
    /// credential when present.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn topic_url(&self, topic_id: &str, rest: &str) -> String {
        self.url(&format!(
            "/api/topics/{}{rest}",
            urlencoding::encode(topic_id)
        ))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let resp = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = resp.status();
        debug!(url = %resp.url(), %status, "service responded");

        match status {
            s if s.is_success() => Ok(resp),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            StatusCode::CONFLICT => Err(ApiError::Conflict),
            s => Err(ApiError::Status(s.as_u16())),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteService for HttpApi {
    async fn sign_in(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        let request = self.client.post(self.url("/auth/signin")).json(credentials);
        self.send_json(request).await
    }

    async fn create_account(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        let request = self
            .client
            .post(self.url("/auth/create-account"))
            .json(credentials);
        self.send_json(request).await
    }

    async fn list_topics(&self) -> ApiResult<Vec<Topic>> {
        self.send_json(self.client.get(self.url("/api/topics"))).await
    }

    async fn create_topic(&self, topic: &NewTopic) -> ApiResult<Topic> {
        let request = self.client.post(self.url("/api/topics")).json(topic);
        self.send_json(request).await
    }

    async fn get_topic(&self, topic_id: &str) -> ApiResult<Topic> {
        self.send_json(self.client.get(self.topic_url(topic_id, ""))).await
    }

    async fn list_contributions(&self, topic_id: &str) -> ApiResult<Vec<Contribution>> {
        self.send_json(self.client.get(self.topic_url(topic_id, "/contributions"))).await
    }

    async fn create_contribution(
        &self,
        topic_id: &str,
        content: &str,
    ) -> ApiResult<Contribution> {
        let body = NewContribution {
            content: content.to_string(),
        };
        let request = self
            .client
            .post(self.topic_url(topic_id, "/contributions"))
            .json(&body);
        self.send_json(request).await
    }

    async fn get_summary(&self, topic_id: &str) -> ApiResult<Option<Summary>> {
        let request = self.client.get(self.topic_url(topic_id, "/summary"));
        match self.send_json(request).await {
            Ok(summary) => Ok(Some(summary)),
            Err(ApiError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn generate_summary(&self, topic_id: &str) -> ApiResult<Summary> {
        self.send_json(self.client.post(self.topic_url(topic_id, "/generate-summary"))).await
    }

    async fn invite(&self, topic_id: &str, emails: &[String]) -> ApiResult<()> {
        let body = Invitation {
            emails: emails.to_vec(),
        };
        let request = self
            .client
            .post(self.topic_url(topic_id, "/invite"))
            .json(&body);
        self.send(request).await?;
        Ok(())
    }
}

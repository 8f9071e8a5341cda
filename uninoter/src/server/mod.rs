//! Development backend implementing the UniNoter API.
//!
//! Architecture:
//! - Topics, contributions, summaries and accounts live in memory
//! - With a data directory, every mutation rewrites `topics.json`,
//!   `contributions.json`, `summaries.json` and `users.json`
//! - Tokens are issued at sign-in and only used to attribute contributions
//!
//! Endpoints:
//! - POST /auth/signin - Sign in
//! - POST /auth/create-account - Register (409 if the email exists)
//! - GET /api/topics - List topics, newest first
//! - POST /api/topics - Create a topic
//! - GET /api/topics/{id} - Get a topic
//! - GET /api/topics/{id}/contributions - List contributions, newest first
//! - POST /api/topics/{id}/contributions - Add a contribution
//! - GET /api/topics/{id}/summary - Current report (404 if none)
//! - POST /api/topics/{id}/generate-summary - Render a report
//! - POST /api/topics/{id}/invite - Acknowledge invitations
//! - GET / - Health message

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{
    AuthResponse, Contribution, Credentials, Invitation, NewContribution, NewTopic, Summary,
    SummaryOrigin, Topic, User,
};
use crate::report::render_report;

const TOPICS_FILE: &str = "topics.json";
const CONTRIBUTIONS_FILE: &str = "contributions.json";
const SUMMARIES_FILE: &str = "summaries.json";
const USERS_FILE: &str = "users.json";

/// An account as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    id: String,
    email: String,
    name: Option<String>,
    password_hash: String,
}

impl Account {
    fn user(&self) -> User {
        User {
            id: Some(self.id.clone()),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Everything the backend persists, keyed by id (summaries by topic id,
/// accounts by email).
#[derive(Debug, Default, Clone)]
struct Records {
    topics: HashMap<String, Topic>,
    contributions: HashMap<String, Contribution>,
    summaries: HashMap<String, Summary>,
    accounts: HashMap<String, Account>,
}

impl Records {
    fn load(dir: &FsPath) -> Result<Self> {
        Ok(Self {
            topics: read_json(&dir.join(TOPICS_FILE))?,
            contributions: read_json(&dir.join(CONTRIBUTIONS_FILE))?,
            summaries: read_json(&dir.join(SUMMARIES_FILE))?,
            accounts: read_json(&dir.join(USERS_FILE))?,
        })
    }

    fn save(&self, dir: &FsPath) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        write_json(&dir.join(TOPICS_FILE), &self.topics)?;
        write_json(&dir.join(CONTRIBUTIONS_FILE), &self.contributions)?;
        write_json(&dir.join(SUMMARIES_FILE), &self.summaries)?;
        write_json(&dir.join(USERS_FILE), &self.accounts)
    }

    /// Contributions for a topic, newest first.
    fn contributions_for(&self, topic_id: &str) -> Vec<Contribution> {
        let mut list: Vec<_> = self
            .contributions
            .values()
            .filter(|c| c.topic_id == topic_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }
}

fn read_json<T: DeserializeOwned + Default>(path: &FsPath) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &FsPath, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    std::fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()))
}

/// Shared server state.
pub struct ServerState {
    records: RwLock<Records>,
    /// Serializes mutations so each one builds on the last saved state.
    writer: Mutex<()>,
    /// Token -> account email.
    tokens: RwLock<HashMap<String, String>>,
    data_dir: Option<PathBuf>,
}

impl ServerState {
    /// State that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            records: RwLock::new(Records::default()),
            writer: Mutex::new(()),
            tokens: RwLock::new(HashMap::new()),
            data_dir: None,
        }
    }

    /// State loaded from, and saved to, `dir`.
    pub fn open(dir: PathBuf) -> Result<Self> {
        let records = Records::load(&dir)?;
        info!(
            dir = %dir.display(),
            topics = records.topics.len(),
            "loaded backend data"
        );
        Ok(Self {
            records: RwLock::new(records),
            writer: Mutex::new(()),
            tokens: RwLock::new(HashMap::new()),
            data_dir: Some(dir),
        })
    }

    /// Apply `change` to a copy of the records, save the copy and only then
    /// publish it. A rejected change or a failed save leaves nothing behind.
    async fn commit<T>(
        &self,
        change: impl FnOnce(&mut Records) -> Result<T, StatusCode>,
    ) -> Result<T, StatusCode> {
        let _writer = self.writer.lock().await;
        let mut next = self.records.read().await.clone();
        let out = change(&mut next)?;

        let next = match self.data_dir.clone() {
            Some(dir) => tokio::task::spawn_blocking(move || next.save(&dir).map(|()| next))
                .await
                .map_err(|e| {
                    error!(error = %e, "save task failed");
                    StatusCode::INTERNAL_SERVER_ERROR
                })?
                .map_err(|e| {
                    error!(error = %e, "failed to save backend data");
                    StatusCode::INTERNAL_SERVER_ERROR
                })?,
            None => next,
        };

        *self.records.write().await = next;
        Ok(out)
    }

    async fn issue_token(&self, email: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens
            .write()
            .await
            .insert(token.clone(), email.to_string());
        token
    }

    async fn caller_email(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        self.tokens.read().await.get(token).cloned()
    }
}

// === Request/Response Types ===

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InviteReceipt {
    pub message: String,
    pub invited_emails: Vec<String>,
    pub topic_id: String,
}

// === Server Lifecycle ===

/// Build the router over `state`.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/auth/signin", post(sign_in))
        .route("/auth/create-account", post(create_account))
        .route("/api/topics", get(list_topics).post(create_topic))
        .route("/api/topics/{topic_id}", get(get_topic))
        .route(
            "/api/topics/{topic_id}/contributions",
            get(list_contributions).post(create_contribution),
        )
        .route("/api/topics/{topic_id}/summary", get(get_summary))
        .route(
            "/api/topics/{topic_id}/generate-summary",
            post(generate_summary),
        )
        .route("/api/topics/{topic_id}/invite", post(invite))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the backend on `127.0.0.1:{port}`.
pub async fn start_server(port: u16, data_dir: Option<PathBuf>) -> Result<()> {
    let state = match data_dir {
        Some(dir) => ServerState::open(dir)?,
        None => ServerState::in_memory(),
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("UniNoter API starting on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, router(Arc::new(state)))
        .await
        .context("Server error")
}

// === Handlers ===

async fn root() -> Json<StatusMessage> {
    Json(StatusMessage {
        message: "UniNoter API is running".to_string(),
    })
}

async fn sign_in(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<Credentials>,
) -> Result<Json<AuthResponse>, StatusCode> {
    let account = state
        .records
        .read()
        .await
        .accounts
        .get(&req.email)
        .cloned()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let parsed_hash = PasswordHash::new(&account.password_hash).map_err(|e| {
        error!(error = %e, "stored password hash is invalid");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let token = state.issue_token(&account.email).await;
    Ok(Json(AuthResponse {
        user: account.user(),
        token: Some(token),
    }))
}

async fn create_account(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<Credentials>,
) -> Result<Json<AuthResponse>, StatusCode> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "failed to hash password");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .to_string();

    let account = state
        .commit(|records| {
            if records.accounts.contains_key(&req.email) {
                return Err(StatusCode::CONFLICT);
            }
            let account = Account {
                id: Uuid::new_v4().to_string(),
                email: req.email,
                name: req.name,
                password_hash,
            };
            records
                .accounts
                .insert(account.email.clone(), account.clone());
            Ok(account)
        })
        .await?;

    info!(email = %account.email, "account created");
    let token = state.issue_token(&account.email).await;
    Ok(Json(AuthResponse {
        user: account.user(),
        token: Some(token),
    }))
}

async fn list_topics(State(state): State<Arc<ServerState>>) -> Json<Vec<Topic>> {
    let records = state.records.read().await;
    let mut topics: Vec<_> = records.topics.values().cloned().collect();
    topics.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(topics)
}

async fn create_topic(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<NewTopic>,
) -> Result<Json<Topic>, StatusCode> {
    if req.title.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let topic = Topic {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        description: req.description,
        created_at: Utc::now(),
    };

    state
        .commit(|records| {
            records.topics.insert(topic.id.clone(), topic.clone());
            Ok(())
        })
        .await?;
    Ok(Json(topic))
}

async fn get_topic(
    State(state): State<Arc<ServerState>>,
    Path(topic_id): Path<String>,
) -> Result<Json<Topic>, StatusCode> {
    let records = state.records.read().await;
    records
        .topics
        .get(&topic_id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn list_contributions(
    State(state): State<Arc<ServerState>>,
    Path(topic_id): Path<String>,
) -> Result<Json<Vec<Contribution>>, StatusCode> {
    let records = state.records.read().await;
    if !records.topics.contains_key(&topic_id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(records.contributions_for(&topic_id)))
}

async fn create_contribution(
    State(state): State<Arc<ServerState>>,
    Path(topic_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<NewContribution>,
) -> Result<Json<Contribution>, StatusCode> {
    let contributor_email = state.caller_email(&headers).await;

    let contribution = state
        .commit(|records| {
            if !records.topics.contains_key(&topic_id) {
                return Err(StatusCode::NOT_FOUND);
            }
            let contribution = Contribution {
                id: Uuid::new_v4().to_string(),
                topic_id,
                content: req.content,
                created_at: Utc::now(),
                contributor_email,
            };
            records
                .contributions
                .insert(contribution.id.clone(), contribution.clone());
            Ok(contribution)
        })
        .await?;
    Ok(Json(contribution))
}

async fn get_summary(
    State(state): State<Arc<ServerState>>,
    Path(topic_id): Path<String>,
) -> Result<Json<Summary>, StatusCode> {
    let records = state.records.read().await;
    if !records.topics.contains_key(&topic_id) {
        return Err(StatusCode::NOT_FOUND);
    }
    records
        .summaries
        .get(&topic_id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn generate_summary(
    State(state): State<Arc<ServerState>>,
    Path(topic_id): Path<String>,
) -> Result<Json<Summary>, StatusCode> {
    let summary = state
        .commit(|records| {
            let topic = records
                .topics
                .get(&topic_id)
                .ok_or(StatusCode::NOT_FOUND)?;
            let contributions = records.contributions_for(&topic_id);
            if contributions.is_empty() {
                return Err(StatusCode::BAD_REQUEST);
            }

            let now = Utc::now();
            let summary = Summary {
                topic_id: topic_id.clone(),
                content: render_report(&topic.title, &contributions, now),
                generated_at: now,
                origin: SummaryOrigin::Remote,
            };
            records.summaries.insert(topic_id, summary.clone());
            Ok(summary)
        })
        .await?;
    Ok(Json(summary))
}

async fn invite(
    State(state): State<Arc<ServerState>>,
    Path(topic_id): Path<String>,
    Json(req): Json<Invitation>,
) -> Result<Json<InviteReceipt>, StatusCode> {
    if !state.records.read().await.topics.contains_key(&topic_id) {
        return Err(StatusCode::NOT_FOUND);
    }
    info!(topic_id, count = req.emails.len(), "invitations accepted");
    Ok(Json(InviteReceipt {
        message: format!("Invitations sent to {} users", req.emails.len()),
        invited_emails: req.emails,
        topic_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::api::{HttpApi, RemoteService};
    use crate::config::FallbackPolicy;
    use crate::error::{ApiError, ClientError};
    use crate::session::SessionStore;
    use crate::storage::LocalCache;
    use crate::testing::{MemoryStore, RecordingNotifier};
    use crate::topics::TopicList;
    use tempfile::tempdir;

    async fn spawn(state: ServerState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(state))).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str, token: Option<String>) -> Arc<HttpApi> {
        Arc::new(HttpApi::new(base_url, token, Duration::from_secs(5)).unwrap())
    }

    fn topic_list(api: Arc<HttpApi>) -> TopicList {
        TopicList::new(
            api,
            LocalCache::new(Arc::new(MemoryStore::default())),
            Arc::new(RecordingNotifier::default()),
            FallbackPolicy::Strict,
        )
    }

    #[tokio::test]
    async fn test_created_topic_heads_next_fetch() {
        let base = spawn(ServerState::in_memory()).await;
        let api = client(&base, None);
        api.create_topic(&NewTopic {
            title: "Older".into(),
            description: None,
        })
        .await
        .unwrap();

        let mut list = topic_list(api.clone());
        let created = list
            .create_topic("Roadmap", Some("Q3 plan"))
            .await
            .unwrap()
            .clone();
        assert!(!created.id.is_empty());

        let mut fresh = topic_list(api);
        let topics = fresh.fetch_topics().await.unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0], created);
        assert_eq!(topics[0].description.as_deref(), Some("Q3 plan"));
    }

    #[tokio::test]
    async fn test_missing_records() {
        let base = spawn(ServerState::in_memory()).await;
        let api = client(&base, None);

        assert_eq!(api.get_topic("nope").await.unwrap_err(), ApiError::NotFound);

        let topic = api
            .create_topic(&NewTopic {
                title: "Roadmap".into(),
                description: None,
            })
            .await
            .unwrap();
        assert_eq!(api.get_summary(&topic.id).await.unwrap(), None);
        assert_eq!(
            api.generate_summary(&topic.id).await.unwrap_err(),
            ApiError::Status(400)
        );
        api.invite(&topic.id, &["a@b.com".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn test_accounts_and_attribution() {
        let base = spawn(ServerState::in_memory()).await;
        let kv = Arc::new(MemoryStore::default());
        let mut session = SessionStore::hydrate(client(&base, None), LocalCache::new(kv));

        session
            .signup("ada@example.com", "hunter2", Some("Ada"))
            .await
            .unwrap();
        let err = session
            .signup("ada@example.com", "other", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::EmailExists));

        let err = session.login("ada@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidCredentials));
        session.login("ada@example.com", "hunter2").await.unwrap();

        let api = client(&base, session.token().map(String::from));
        let topic = api
            .create_topic(&NewTopic {
                title: "Roadmap".into(),
                description: None,
            })
            .await
            .unwrap();
        let contribution = api.create_contribution(&topic.id, "hello").await.unwrap();
        assert_eq!(
            contribution.contributor_email.as_deref(),
            Some("ada@example.com")
        );

        let summary = api.generate_summary(&topic.id).await.unwrap();
        assert!(summary.content.contains("### Insight 1\nhello"));
        assert_eq!(api.get_summary(&topic.id).await.unwrap(), Some(summary));
    }

    #[tokio::test]
    async fn test_data_survives_restart() {
        let dir = tempdir().unwrap();
        let base = spawn(ServerState::open(dir.path().to_path_buf()).unwrap()).await;
        let topic = client(&base, None)
            .create_topic(&NewTopic {
                title: "Roadmap".into(),
                description: None,
            })
            .await
            .unwrap();
        assert!(dir.path().join(TOPICS_FILE).exists());

        let base = spawn(ServerState::open(dir.path().to_path_buf()).unwrap()).await;
        let topics = client(&base, None).list_topics().await.unwrap();
        assert_eq!(topics, vec![topic]);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_no_trace() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let base = spawn(ServerState::open(blocker).unwrap()).await;
        let api = client(&base, None);

        let err = api
            .create_topic(&NewTopic {
                title: "Roadmap".into(),
                description: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Status(500));
        assert!(api.list_topics().await.unwrap().is_empty());

        let mut list = topic_list(api);
        assert!(list.create_topic("Roadmap", None).await.is_err());
        assert!(list.fetch_topics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writes_are_all_saved() {
        let dir = tempdir().unwrap();
        let base = spawn(ServerState::open(dir.path().to_path_buf()).unwrap()).await;
        let api = client(&base, None);

        let creates = (0..8).map(|i| {
            let api = api.clone();
            tokio::spawn(async move {
                api.create_topic(&NewTopic {
                    title: format!("Topic {i}"),
                    description: None,
                })
                .await
            })
        });
        for handle in creates.collect::<Vec<_>>() {
            handle.await.unwrap().unwrap();
        }

        let reopened = ServerState::open(dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.records.read().await.topics.len(), 8);
    }
}

//! In-memory doubles for view-model tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Notify;

use crate::api::{ApiResult, RemoteService};
use crate::error::{ApiError, StorageError};
use crate::models::{AuthResponse, Contribution, Credentials, NewTopic, Summary, Topic, User};
use crate::notify::{Notice, NoticeLevel, Notifier};
use crate::storage::KeyValueStore;

pub fn sample_topic(id: &str, title: &str) -> Topic {
    Topic {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    }
}

pub fn sample_contribution(id: &str, topic_id: &str, content: &str) -> Contribution {
    Contribution {
        id: id.to_string(),
        topic_id: topic_id.to_string(),
        content: content.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
        contributor_email: None,
    }
}

// === Local store ===

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

// === Notifier ===

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.lock().unwrap().last().cloned()
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.level == level)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

// === Remote service ===

/// Remote operations, for the call log and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    SignIn,
    CreateAccount,
    ListTopics,
    CreateTopic,
    GetTopic,
    ListContributions,
    CreateContribution,
    GetSummary,
    GenerateSummary,
    Invite,
}

#[derive(Default)]
struct FakeState {
    users: HashMap<String, String>,
    topics: Vec<Topic>,
    contributions: Vec<Contribution>,
    summaries: HashMap<String, Summary>,
    invites: Vec<(String, Vec<String>)>,
    next_id: u64,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn topic(&self, topic_id: &str) -> ApiResult<Topic> {
        self.topics
            .iter()
            .find(|t| t.id == topic_id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }
}

/// A consistent in-memory backend. Collections are kept newest first.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
    failures: Mutex<HashMap<Op, ApiError>>,
    calls: Mutex<Vec<Op>>,
    gates: Mutex<HashMap<Op, Arc<Notify>>>,
}

impl FakeRemote {
    pub fn add_user(&self, email: &str, password: &str) {
        self.state
            .lock()
            .unwrap()
            .users
            .insert(email.to_string(), password.to_string());
    }

    pub fn add_topic(&self, topic: Topic) {
        self.state.lock().unwrap().topics.insert(0, topic);
    }

    pub fn add_contribution(&self, contribution: Contribution) {
        self.state
            .lock()
            .unwrap()
            .contributions
            .insert(0, contribution);
    }

    pub fn set_summary(&self, summary: Summary) {
        self.state
            .lock()
            .unwrap()
            .summaries
            .insert(summary.topic_id.clone(), summary);
    }

    /// Make every call to `op` fail with `error` until cleared.
    pub fn fail(&self, op: Op, error: ApiError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<Op> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    pub fn invites(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().unwrap().invites.clone()
    }

    /// Hold calls to `op` in flight until the returned handle is notified.
    pub fn hold(&self, op: Op) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(op, gate.clone());
        gate
    }

    async fn pass_gate(&self, op: Op) {
        let gate = self.gates.lock().unwrap().get(&op).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn enter(&self, op: Op) -> ApiResult<()> {
        self.calls.lock().unwrap().push(op);
        match self.failures.lock().unwrap().get(&op) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn auth_response(email: &str, name: Option<String>) -> AuthResponse {
        AuthResponse {
            user: User {
                id: Some(format!("user-{email}")),
                email: email.to_string(),
                name,
            },
            token: Some(format!("token-{email}")),
        }
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn sign_in(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        self.enter(Op::SignIn)?;
        let state = self.state.lock().unwrap();
        match state.users.get(&credentials.email) {
            Some(password) if *password == credentials.password => {
                Ok(Self::auth_response(&credentials.email, None))
            }
            _ => Err(ApiError::Status(401)),
        }
    }

    async fn create_account(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        self.enter(Op::CreateAccount)?;
        let mut state = self.state.lock().unwrap();
        if state.users.contains_key(&credentials.email) {
            return Err(ApiError::Conflict);
        }
        state
            .users
            .insert(credentials.email.clone(), credentials.password.clone());
        Ok(Self::auth_response(
            &credentials.email,
            credentials.name.clone(),
        ))
    }

    async fn list_topics(&self) -> ApiResult<Vec<Topic>> {
        self.enter(Op::ListTopics)?;
        Ok(self.state.lock().unwrap().topics.clone())
    }

    async fn create_topic(&self, topic: &NewTopic) -> ApiResult<Topic> {
        self.enter(Op::CreateTopic)?;
        let mut state = self.state.lock().unwrap();
        let created = Topic {
            id: state.next_id("topic"),
            title: topic.title.clone(),
            description: topic.description.clone(),
            created_at: Utc::now(),
        };
        state.topics.insert(0, created.clone());
        Ok(created)
    }

    async fn get_topic(&self, topic_id: &str) -> ApiResult<Topic> {
        self.enter(Op::GetTopic)?;
        self.state.lock().unwrap().topic(topic_id)
    }

    async fn list_contributions(&self, topic_id: &str) -> ApiResult<Vec<Contribution>> {
        self.enter(Op::ListContributions)?;
        let state = self.state.lock().unwrap();
        state.topic(topic_id)?;
        Ok(state
            .contributions
            .iter()
            .filter(|c| c.topic_id == topic_id)
            .cloned()
            .collect())
    }

    async fn create_contribution(
        &self,
        topic_id: &str,
        content: &str,
    ) -> ApiResult<Contribution> {
        self.enter(Op::CreateContribution)?;
        self.pass_gate(Op::CreateContribution).await;
        let mut state = self.state.lock().unwrap();
        state.topic(topic_id)?;
        let created = Contribution {
            id: state.next_id("contribution"),
            topic_id: topic_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            contributor_email: None,
        };
        state.contributions.insert(0, created.clone());
        Ok(created)
    }

    async fn get_summary(&self, topic_id: &str) -> ApiResult<Option<Summary>> {
        self.enter(Op::GetSummary)?;
        let state = self.state.lock().unwrap();
        state.topic(topic_id)?;
        Ok(state.summaries.get(topic_id).cloned())
    }

    async fn generate_summary(&self, topic_id: &str) -> ApiResult<Summary> {
        self.enter(Op::GenerateSummary)?;
        self.pass_gate(Op::GenerateSummary).await;
        let mut state = self.state.lock().unwrap();
        let topic = state.topic(topic_id)?;
        let count = state
            .contributions
            .iter()
            .filter(|c| c.topic_id == topic_id)
            .count();
        if count == 0 {
            return Err(ApiError::Status(400));
        }
        let summary = Summary {
            topic_id: topic_id.to_string(),
            content: format!("Server report for {} ({count})", topic.title),
            generated_at: Utc::now(),
            origin: crate::models::SummaryOrigin::Remote,
        };
        state.summaries.insert(topic_id.to_string(), summary.clone());
        Ok(summary)
    }

    async fn invite(&self, topic_id: &str, emails: &[String]) -> ApiResult<()> {
        self.enter(Op::Invite)?;
        let mut state = self.state.lock().unwrap();
        state.topic(topic_id)?;
        state.invites.push((topic_id.to_string(), emails.to_vec()));
        Ok(())
    }
}

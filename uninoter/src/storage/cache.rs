//! Typed access to the locally persisted state.
//!
//! Keys: `auth_user`, `auth_token`, `topics`, `contributions_{topic}`,
//! `summary_{topic}`. Values are JSON text.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::KeyValueStore;
use crate::error::StorageError;
use crate::models::{Contribution, Session, Summary, Topic, User};

const USER_KEY: &str = "auth_user";
const TOKEN_KEY: &str = "auth_token";
const TOPICS_KEY: &str = "topics";

fn contributions_key(topic_id: &str) -> String {
    format!("contributions_{topic_id}")
}

fn summary_key(topic_id: &str) -> String {
    format!("summary_{topic_id}")
}

/// The session record plus resilience snapshots of topics, contributions
/// and summaries.
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
}

impl LocalCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw)
    }

    /// Read a snapshot, treating any failure as "nothing cached".
    fn load_or_none<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.load(key).unwrap_or_else(|e| {
            warn!(key, error = %e, "ignoring unreadable cache entry");
            None
        })
    }

    /// Write a snapshot; failures are logged, never propagated.
    fn save_or_warn<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = self.save(key, value) {
            warn!(key, error = %e, "failed to update local cache");
        }
    }

    // --- Session ---

    /// Load the persisted session. A corrupt user record is removed and
    /// the session comes back empty.
    pub fn load_session(&self) -> Session {
        let user = match self.load::<User>(USER_KEY) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "discarding stored session");
                if let Err(e) = self.store.remove(USER_KEY) {
                    warn!(error = %e, "failed to remove stored session");
                }
                None
            }
        };
        let token = user
            .as_ref()
            .and_then(|_| self.load_or_none::<String>(TOKEN_KEY));
        Session { user, token }
    }

    pub fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        match &session.user {
            Some(user) => self.save(USER_KEY, user)?,
            None => self.store.remove(USER_KEY)?,
        }
        match &session.token {
            Some(token) => self.save(TOKEN_KEY, token),
            None => self.store.remove(TOKEN_KEY),
        }
    }

    pub fn clear_session(&self) -> Result<(), StorageError> {
        self.store.remove(USER_KEY)?;
        self.store.remove(TOKEN_KEY)
    }

    // --- Topics ---

    pub fn topics(&self) -> Option<Vec<Topic>> {
        self.load_or_none(TOPICS_KEY)
    }

    pub fn save_topics(&self, topics: &[Topic]) {
        self.save_or_warn(TOPICS_KEY, topics);
    }

    // --- Contributions ---

    pub fn contributions(&self, topic_id: &str) -> Option<Vec<Contribution>> {
        self.load_or_none(&contributions_key(topic_id))
    }

    pub fn save_contributions(&self, topic_id: &str, contributions: &[Contribution]) {
        self.save_or_warn(&contributions_key(topic_id), contributions);
    }

    // --- Summaries ---

    pub fn summary(&self, topic_id: &str) -> Option<Summary> {
        self.load_or_none(&summary_key(topic_id))
    }

    pub fn save_summary(&self, summary: &Summary) {
        self.save_or_warn(&summary_key(&summary.topic_id), summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_topic, MemoryStore};

    fn cache() -> (Arc<MemoryStore>, LocalCache) {
        let store = Arc::new(MemoryStore::default());
        (store.clone(), LocalCache::new(store))
    }

    #[test]
    fn test_corrupt_session_is_cleared() {
        let (store, cache) = cache();
        store.set(USER_KEY, "{not json").unwrap();
        store.set(TOKEN_KEY, "\"tok\"").unwrap();

        let session = cache.load_session();
        assert!(!session.is_authenticated());
        assert_eq!(session.token, None);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_session_round_trip_and_clear() {
        let (store, cache) = cache();
        let session = Session {
            user: Some(User {
                id: Some("u-1".into()),
                email: "ada@example.com".into(),
                name: None,
            }),
            token: Some("tok".into()),
        };
        cache.save_session(&session).unwrap();
        assert_eq!(cache.load_session(), session);

        cache.clear_session().unwrap();
        assert_eq!(cache.load_session(), Session::default());
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_snapshots_are_keyed_by_topic() {
        let (store, cache) = cache();
        let topic = sample_topic("t-1", "Roadmap");
        cache.save_topics(std::slice::from_ref(&topic));
        assert_eq!(cache.topics(), Some(vec![topic]));

        cache.save_contributions("t-1", &[]);
        assert!(store.get("contributions_t-1").unwrap().is_some());
        assert_eq!(cache.contributions("t-2"), None);

        store.set("summary_t-1", "garbage").unwrap();
        assert_eq!(cache.summary("t-1"), None);
    }
}

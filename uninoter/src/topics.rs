//! Topic list view-model.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::RemoteService;
use crate::config::FallbackPolicy;
use crate::error::{ClientError, ClientResult};
use crate::models::{NewTopic, Topic};
use crate::notify::{Notice, Notifier};
use crate::storage::LocalCache;

/// State behind the topic list screen.
pub struct TopicList {
    remote: Arc<dyn RemoteService>,
    cache: LocalCache,
    notifier: Arc<dyn Notifier>,
    policy: FallbackPolicy,
    topics: Vec<Topic>,
    loading: bool,
}

impl TopicList {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        cache: LocalCache,
        notifier: Arc<dyn Notifier>,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            remote,
            cache,
            notifier,
            policy,
            topics: Vec::new(),
            loading: false,
        }
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Replace the list with the service's topics, in the service's order.
    pub async fn fetch_topics(&mut self) -> ClientResult<&[Topic]> {
        self.loading = true;
        let result = self.remote.list_topics().await;
        self.loading = false;

        match result {
            Ok(topics) => {
                self.cache.save_topics(&topics);
                self.topics = topics;
            }
            Err(e) if self.policy.uses_cache() => {
                warn!(error = %e, "topic fetch failed, using cached topics");
                self.topics = self.cache.topics().unwrap_or_default();
                self.notifier.notify(Notice::warning(
                    "Working offline",
                    "Showing topics saved on this device.",
                ));
            }
            Err(e) => {
                self.topics.clear();
                self.notifier.notify(Notice::error(
                    "Failed to load topics",
                    "Please try again later.",
                ));
                return Err(e.into());
            }
        }
        Ok(&self.topics)
    }

    /// Create a topic and put it at the top of the list.
    pub async fn create_topic(
        &mut self,
        title: &str,
        description: Option<&str>,
    ) -> ClientResult<&Topic> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ClientError::EmptyTitle);
        }
        let request = NewTopic {
            title: title.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from),
        };

        let topic = match self.remote.create_topic(&request).await {
            Ok(topic) => {
                info!(topic_id = %topic.id, "topic created");
                self.notifier.notify(Notice::success(
                    "Topic created",
                    format!("\"{}\" is ready for contributions.", topic.title),
                ));
                topic
            }
            // Only an unreachable backend justifies a local-only topic.
            Err(e) if self.policy.uses_cache() && e.is_unreachable() => {
                warn!(error = %e, "service unreachable, creating topic locally");
                self.notifier.notify(Notice::warning(
                    "Saved on this device",
                    "The server could not be reached; the topic only exists locally.",
                ));
                Topic::new_local(request.title, request.description)
            }
            Err(e) => {
                self.notifier.notify(Notice::error(
                    "Failed to create topic",
                    "Please try again later.",
                ));
                return Err(e.into());
            }
        };

        self.topics.insert(0, topic);
        self.cache.save_topics(&self.topics);
        Ok(&self.topics[0])
    }
}

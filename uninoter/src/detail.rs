//! Topic detail view-model: one topic, its contributions and its report.
//!
//! Operations take `&self` so a front end can fire them concurrently. The
//! state lock is never held across a service call. Every load bumps an
//! epoch, and results that come back for an older epoch are dropped.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::RemoteService;
use crate::config::FallbackPolicy;
use crate::error::{ApiError, ClientError, ClientResult};
use crate::models::{Contribution, Summary, SummaryOrigin, Topic};
use crate::notify::{Notice, Notifier};
use crate::report::ReportSynthesizer;
use crate::storage::LocalCache;

/// Where the screen is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Loading,
    Ready,
    NotFound,
}

/// Everything the detail screen renders.
#[derive(Debug, Clone, Default)]
pub struct DetailView {
    pub phase: Phase,
    pub topic: Option<Topic>,
    /// Newest first.
    pub contributions: Vec<Contribution>,
    pub summary: Option<Summary>,
    /// The topic could not be shown because its request failed, not
    /// because the service reported it missing.
    pub load_failed: bool,
    /// Text in the contribution input.
    pub draft: String,
    pub submitting: bool,
    pub generating: bool,
}

#[derive(Default)]
struct DetailState {
    epoch: u64,
    view: DetailView,
}

pub struct TopicDetail {
    remote: Arc<dyn RemoteService>,
    cache: LocalCache,
    notifier: Arc<dyn Notifier>,
    synthesizer: Arc<dyn ReportSynthesizer>,
    policy: FallbackPolicy,
    state: Mutex<DetailState>,
}

impl TopicDetail {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        cache: LocalCache,
        notifier: Arc<dyn Notifier>,
        synthesizer: Arc<dyn ReportSynthesizer>,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            remote,
            cache,
            notifier,
            synthesizer,
            policy,
            state: Mutex::new(DetailState::default()),
        }
    }

    /// A copy of the current screen state.
    pub async fn snapshot(&self) -> DetailView {
        self.state.lock().await.view.clone()
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.view.phase
    }

    pub async fn topic(&self) -> Option<Topic> {
        self.state.lock().await.view.topic.clone()
    }

    pub async fn contributions(&self) -> Vec<Contribution> {
        self.state.lock().await.view.contributions.clone()
    }

    pub async fn summary(&self) -> Option<Summary> {
        self.state.lock().await.view.summary.clone()
    }

    pub async fn draft(&self) -> String {
        self.state.lock().await.view.draft.clone()
    }

    pub async fn is_submitting(&self) -> bool {
        self.state.lock().await.view.submitting
    }

    pub async fn is_generating(&self) -> bool {
        self.state.lock().await.view.generating
    }

    /// Load a topic, its contributions and its report concurrently.
    pub async fn load_topic(&self, topic_id: &str) -> Phase {
        let epoch = {
            let mut state = self.state.lock().await;
            state.epoch += 1;
            state.view = DetailView::default();
            state.epoch
        };

        let (topic, contributions, summary) = tokio::join!(
            self.remote.get_topic(topic_id),
            self.remote.list_contributions(topic_id),
            self.remote.get_summary(topic_id),
        );

        let request_failed = matches!(&topic, Err(e) if *e != ApiError::NotFound);
        let topic = self.resolve_topic(topic_id, topic);
        let contributions = self.resolve_contributions(topic_id, topic.is_some(), contributions);
        let summary = self.resolve_summary(topic_id, summary);

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            debug!(topic_id, "discarding superseded load");
            return state.view.phase;
        }
        state.view.phase = if topic.is_some() {
            Phase::Ready
        } else {
            Phase::NotFound
        };
        state.view.load_failed = request_failed && topic.is_none();
        state.view.topic = topic;
        state.view.contributions = contributions;
        state.view.summary = summary;
        state.view.phase
    }

    fn resolve_topic(&self, topic_id: &str, result: Result<Topic, ApiError>) -> Option<Topic> {
        let error = match result {
            Ok(topic) => return Some(topic),
            // The service answered; a stale cached copy must not revive it.
            Err(ApiError::NotFound) => return None,
            Err(e) => e,
        };
        let cached = if self.policy.uses_cache() {
            self.cache
                .topics()
                .and_then(|topics| topics.into_iter().find(|t| t.id == topic_id))
        } else {
            None
        };
        if cached.is_some() {
            warn!(topic_id, error = %error, "using cached topic");
        } else {
            warn!(topic_id, error = %error, "failed to load topic");
            self.notifier.notify(Notice::error(
                "Failed to load topic",
                "Please try again later.",
            ));
        }
        cached
    }

    fn resolve_contributions(
        &self,
        topic_id: &str,
        topic_found: bool,
        result: Result<Vec<Contribution>, ApiError>,
    ) -> Vec<Contribution> {
        match result {
            Ok(list) => {
                let total = list.len();
                let list: Vec<_> = list.into_iter().filter(|c| c.topic_id == topic_id).collect();
                if list.len() != total {
                    warn!(topic_id, dropped = total - list.len(), "dropped foreign contributions");
                }
                self.cache.save_contributions(topic_id, &list);
                list
            }
            Err(e) => {
                if topic_found && e != ApiError::NotFound {
                    warn!(topic_id, error = %e, "failed to load contributions");
                    self.notifier.notify(Notice::error(
                        "Failed to load contributions",
                        "Please try again later.",
                    ));
                }
                if self.policy.uses_cache() {
                    self.cache.contributions(topic_id).unwrap_or_default()
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn resolve_summary(
        &self,
        topic_id: &str,
        result: Result<Option<Summary>, ApiError>,
    ) -> Option<Summary> {
        match result {
            Ok(Some(summary)) => {
                self.cache.save_summary(&summary);
                Some(summary)
            }
            // No report yet.
            Ok(None) => None,
            Err(e) => {
                warn!(topic_id, error = %e, "failed to load summary");
                if self.policy.uses_cache() {
                    self.cache.summary(topic_id)
                } else {
                    None
                }
            }
        }
    }

    /// Post `text` as a new contribution.
    ///
    /// Returns `Ok(None)` without contacting the service when the trimmed
    /// text is empty or another submission is still in flight.
    pub async fn submit_contribution(&self, text: &str) -> ClientResult<Option<Contribution>> {
        let content = text.trim();
        let (epoch, topic_id) = {
            let mut state = self.state.lock().await;
            if state.view.submitting {
                return Ok(None);
            }
            state.view.draft = text.to_string();
            if content.is_empty() {
                return Ok(None);
            }
            let topic_id = match (&state.view.phase, &state.view.topic) {
                (Phase::Ready, Some(topic)) => topic.id.clone(),
                _ => return Err(ClientError::TopicNotLoaded),
            };
            state.view.submitting = true;
            (state.epoch, topic_id)
        };

        let result = self.remote.create_contribution(&topic_id, content).await;

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            debug!(topic_id, "screen changed, not inserting contribution");
            return result.map(Some).map_err(Into::into);
        }
        state.view.submitting = false;

        match result {
            Ok(contribution) if contribution.topic_id != topic_id => {
                self.notifier.notify(Notice::error(
                    "Failed to add contribution",
                    "The server answered for a different topic.",
                ));
                Err(ClientError::TopicMismatch(contribution.topic_id))
            }
            Ok(contribution) => {
                info!(topic_id, contribution_id = %contribution.id, "contribution added");
                state.view.contributions.insert(0, contribution.clone());
                self.cache.save_contributions(&topic_id, &state.view.contributions);
                state.view.draft.clear();
                self.notifier.notify(Notice::success(
                    "Contribution added",
                    "Your contribution has been successfully added to the topic.",
                ));
                Ok(Some(contribution))
            }
            Err(e) => {
                warn!(topic_id, error = %e, "failed to add contribution");
                self.notifier.notify(Notice::error(
                    "Failed to add contribution",
                    "Your text was kept. Please try again.",
                ));
                Err(e.into())
            }
        }
    }

    /// Ask the service for a report, falling back to the offline strategy.
    ///
    /// Returns `Ok(None)` when a generation is already in flight.
    pub async fn generate_report(&self) -> ClientResult<Option<Summary>> {
        let (epoch, topic, contributions) = {
            let mut state = self.state.lock().await;
            let topic = match (&state.view.phase, &state.view.topic) {
                (Phase::Ready, Some(topic)) => topic.clone(),
                _ => return Err(ClientError::TopicNotLoaded),
            };
            if state.view.contributions.is_empty() {
                self.notifier.notify(Notice::warning(
                    "No contributions",
                    "Add some contributions before generating a report.",
                ));
                return Err(ClientError::NoContributions);
            }
            if state.view.generating {
                return Ok(None);
            }
            state.view.generating = true;
            (state.epoch, topic, state.view.contributions.clone())
        };

        let result = match self.remote.generate_summary(&topic.id).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                warn!(topic_id = %topic.id, error = %e, "report generation failed");
                self.synthesizer
                    .synthesize(&topic, &contributions, Utc::now())
                    .ok_or(e)
            }
        };

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            debug!(topic_id = %topic.id, "screen changed, not showing report");
            return result.map(Some).map_err(Into::into);
        }
        state.view.generating = false;

        match result {
            Ok(summary) => {
                self.cache.save_summary(&summary);
                state.view.summary = Some(summary.clone());
                self.notifier.notify(match summary.origin {
                    SummaryOrigin::Remote => Notice::success(
                        "Report generated",
                        "The collaborative report has been successfully generated.",
                    ),
                    SummaryOrigin::Offline => Notice::warning(
                        "Offline report",
                        "The server could not generate a report; showing a local draft.",
                    ),
                });
                Ok(Some(summary))
            }
            Err(e) => {
                self.notifier.notify(Notice::error(
                    "Generation failed",
                    "Failed to generate the report. Please try again.",
                ));
                Err(e.into())
            }
        }
    }
}

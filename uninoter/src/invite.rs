//! Invitation dialog view-model.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::RemoteService;
use crate::error::{ClientError, ClientResult};
use crate::notify::{plural, Notice, Notifier};

/// Email slots for inviting collaborators to one topic.
pub struct InviteForm {
    remote: Arc<dyn RemoteService>,
    notifier: Arc<dyn Notifier>,
    topic_id: String,
    slots: Vec<String>,
    open: bool,
    inviting: bool,
}

impl InviteForm {
    /// An open dialog with a single empty slot.
    pub fn new(
        remote: Arc<dyn RemoteService>,
        notifier: Arc<dyn Notifier>,
        topic_id: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            notifier,
            topic_id: topic_id.into(),
            slots: vec![String::new()],
            open: true,
            inviting: false,
        }
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub const fn is_open(&self) -> bool {
        self.open
    }

    pub const fn is_inviting(&self) -> bool {
        self.inviting
    }

    pub fn add_slot(&mut self) {
        self.slots.push(String::new());
    }

    /// Set slot `index`. Out-of-range indices are ignored.
    pub fn update_slot(&mut self, index: usize, value: impl Into<String>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = value.into();
        }
    }

    /// Remove slot `index`, unless it is the only one left.
    pub fn remove_slot(&mut self, index: usize) {
        if self.slots.len() > 1 && index < self.slots.len() {
            self.slots.remove(index);
        }
    }

    /// Slot values that look like addresses: non-blank and containing `@`.
    pub fn valid_emails(&self) -> Vec<String> {
        self.slots
            .iter()
            .map(|slot| slot.trim())
            .filter(|email| !email.is_empty() && email.contains('@'))
            .map(String::from)
            .collect()
    }

    /// Send the valid addresses to the service. Returns how many were sent.
    pub async fn send_invites(&mut self) -> ClientResult<usize> {
        let emails = self.valid_emails();
        if emails.is_empty() {
            self.notifier.notify(Notice::error(
                "No valid emails",
                "Please enter at least one valid email address.",
            ));
            return Err(ClientError::NoValidEmails);
        }

        self.inviting = true;
        let result = self.remote.invite(&self.topic_id, &emails).await;
        self.inviting = false;

        match result {
            Ok(()) => {
                info!(topic_id = %self.topic_id, count = emails.len(), "invitations sent");
                self.notifier.notify(Notice::success(
                    "Invitations sent",
                    format!(
                        "Successfully invited {} to collaborate.",
                        plural(emails.len(), "user")
                    ),
                ));
                self.slots = vec![String::new()];
                self.open = false;
                Ok(emails.len())
            }
            Err(e) => {
                warn!(topic_id = %self.topic_id, error = %e, "failed to send invitations");
                self.notifier.notify(Notice::error(
                    "Failed to send invitations",
                    "Please try again later.",
                ));
                Err(e.into())
            }
        }
    }
}

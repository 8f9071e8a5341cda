//! User-visible transient notifications.

use tracing::{info, warn};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A short message for the user, the equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, description)
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, description)
    }

    fn new(level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Where view-models send notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Prints notices to the terminal. Errors and warnings go to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => {
                info!(title = %notice.title, "notice");
                println!("✓ {}: {}", notice.title, notice.description);
            }
            NoticeLevel::Warning => {
                warn!(title = %notice.title, "notice");
                eprintln!("! {}: {}", notice.title, notice.description);
            }
            NoticeLevel::Error => {
                warn!(title = %notice.title, "notice");
                eprintln!("✗ {}: {}", notice.title, notice.description);
            }
        }
    }
}

/// `"1 user"` / `"3 users"`.
pub(crate) fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

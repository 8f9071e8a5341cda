//! Data models for uninoter entities.
//!
//! Field names follow the remote service's snake_case JSON.

mod contribution;
mod session;
mod summary;
pub mod timestamp;
mod topic;

pub use contribution::{Contribution, NewContribution};
pub use session::{AuthResponse, Credentials, Session, User};
pub use summary::{Summary, SummaryOrigin};
pub use topic::{Invitation, NewTopic, Topic};

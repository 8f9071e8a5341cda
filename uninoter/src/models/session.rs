//! Session model: the authenticated user and credential token.

use serde::{Deserialize, Serialize};

/// A user record as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The current session. Empty when nobody is logged in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Logged-in user.
    pub user: Option<User>,
    /// Opaque token handed out by the service, if any.
    pub token: Option<String>,
}

impl Session {
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Body of the sign-in and create-account requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Response of the sign-in and create-account requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

//! The session store: who is logged in, persisted across runs.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::RemoteService;
use crate::error::{ApiError, ClientError, ClientResult};
use crate::models::{AuthResponse, Credentials, Session, User};
use crate::storage::LocalCache;

/// Holds the current session and mirrors it into the local cache.
pub struct SessionStore {
    remote: Arc<dyn RemoteService>,
    cache: LocalCache,
    session: Session,
}

impl SessionStore {
    /// Load the persisted session once. Corrupt data yields a logged-out
    /// store rather than an error.
    pub fn hydrate(remote: Arc<dyn RemoteService>, cache: LocalCache) -> Self {
        let session = cache.load_session();
        Self {
            remote,
            cache,
            session,
        }
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn user(&self) -> Option<&User> {
        self.session.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token.as_deref()
    }

    pub const fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<&User> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
            name: None,
        };
        let response = self.remote.sign_in(&credentials).await.map_err(|e| {
            warn!(error = %e, "sign-in failed");
            ClientError::InvalidCredentials
        })?;
        self.establish(response)
    }

    pub async fn signup(
        &mut self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> ClientResult<&User> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
            name: name.map(String::from),
        };
        let response = self
            .remote
            .create_account(&credentials)
            .await
            .map_err(|e| match e {
                ApiError::Conflict => ClientError::EmailExists,
                e => {
                    warn!(error = %e, "account creation failed");
                    ClientError::AccountCreationFailed
                }
            })?;
        self.establish(response)
    }

    /// Forget the session locally. The service is not contacted.
    pub fn logout(&mut self) -> ClientResult<()> {
        self.session = Session::default();
        self.cache.clear_session()?;
        Ok(())
    }

    fn establish(&mut self, response: AuthResponse) -> ClientResult<&User> {
        let session = Session {
            user: Some(response.user),
            token: response.token,
        };
        self.cache.save_session(&session)?;
        self.session = session;

        let user = self.session.user.as_ref().ok_or(ClientError::InvalidCredentials)?;
        info!(email = %user.email, "session established");
        Ok(user)
    }
}

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use agora_api::AuthBackend;
use agora_session::{SessionStore, token};
use agora_types::api::{Credentials, LoginRequest, LogoutRequest, RegisterRequest, SessionUser};

use crate::error::{AuthError, DiscussionError, Rejection, Result};

/// Sign-in flows backed by the persisted session.
pub struct SessionManager<A> {
    backend: A,
    store: Arc<SessionStore>,
}

impl<A: AuthBackend> SessionManager<A> {
    pub fn new(backend: A, store: Arc<SessionStore>) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Fetch a CSRF token and keep it for later requests.
    pub async fn fetch_csrf(&self) -> Result<String> {
        let token = self.backend.fetch_csrf().await.map_err(AuthError::Rejected)?;
        self.store.save_csrf(&token)?;
        Ok(token)
    }

    /// On failure nothing is stored and the caller may retry.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Rejection::EmptyText.into());
        }
        let req = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let resp = self.backend.login(&req).await.map_err(|e| {
            warn!("Login for {} refused: {}", req.email, e);
            AuthError::Rejected(e)
        })?;

        let user = self.store.save_login(&resp)?;
        info!("{} ({}) signed in", user.name, user.id);
        Ok(user)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<SessionUser> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(Rejection::EmptyText.into());
        }
        let req = RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let resp = self.backend.register(&req).await.map_err(|e| {
            warn!("Registration for {} refused: {}", req.email, e);
            AuthError::Rejected(e)
        })?;

        let user = self.store.save_login(&resp)?;
        info!("Registered {} ({})", user.name, user.id);
        Ok(user)
    }

    /// Tell the server to drop the refresh token, then forget the login
    /// whatever it answered.
    pub async fn logout(&self) -> Result<()> {
        if let Some(refresh) = self.store.credentials()?.refresh_token {
            if let Err(e) = self.backend.logout(&LogoutRequest { refresh }).await {
                warn!("Server logout failed, clearing local session anyway: {}", e);
            }
        }
        self.store.clear_login()?;
        info!("Signed out");
        Ok(())
    }

    /// The signed-in user. An access token past its `exp` counts as signed
    /// out.
    pub fn current_user(&self) -> Result<SessionUser> {
        let credentials = self.store.credentials()?;
        let (Some(user), Some(access)) = (self.store.user()?, credentials.access_token) else {
            return Err(AuthError::SignedOut.into());
        };
        if token::is_expired(&access, Utc::now()) {
            return Err(AuthError::SessionExpired.into());
        }
        Ok(user)
    }

    /// Stored tokens, for handing to the HTTP client at startup.
    pub fn credentials(&self) -> Result<Credentials> {
        self.store.credentials().map_err(DiscussionError::from)
    }
}

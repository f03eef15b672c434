//! Session context and its single writer, the [`AuthManager`].

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{ApiClient, AuthClient};
use crate::error::{ApiError, ApiResult};
use crate::models::{ProfileUpdate, Registration, User};
use crate::token_store::TokenStore;

/// Who is logged in. `user` is only ever set while `token` is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Observable session state.
pub struct SessionStore {
    tx: watch::Sender<Session>,
}

impl SessionStore {
    pub fn new(initial: Session) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get_session(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn set_session(&self, session: Session) {
        self.tx.send_replace(session);
    }

    pub fn on_change(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only view of the session for components that are not the writer.
#[derive(Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<Session>,
}

impl SessionHandle {
    pub fn get_session(&self) -> Session {
        self.rx.borrow().clone()
    }

    pub fn on_change(&self) -> watch::Receiver<Session> {
        self.rx.clone()
    }
}

/// Owns the token lifecycle and is the only component that changes the
/// session.
pub struct AuthManager {
    tokens: Arc<dyn TokenStore>,
    auth: AuthClient,
    store: SessionStore,
}

impl AuthManager {
    /// The initial state comes straight from the token store, before any
    /// request is made.
    pub fn new(api: &ApiClient) -> Self {
        let tokens = api.tokens().clone();
        let initial = Session {
            token: tokens.get(),
            user: None,
        };
        Self {
            tokens,
            auth: api.auth(),
            store: SessionStore::new(initial),
        }
    }

    pub fn session(&self) -> Session {
        self.store.get_session()
    }

    pub fn handle(&self) -> SessionHandle {
        self.store.handle()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.get_session().is_authenticated()
    }

    /// Fills in the user for a token found at startup.
    pub async fn restore(&self) -> Session {
        if let Some(token) = self.store.get_session().token {
            self.reconcile(&token).await;
        }
        self.store.get_session()
    }

    /// Stores `token` and then fetches the user it belongs to. A failed
    /// fetch leaves the session logged in with no user.
    pub async fn login(&self, token: &str) -> ApiResult<()> {
        self.tokens.set(token)?;
        self.store.set_session(Session {
            token: Some(token.to_string()),
            user: None,
        });
        tracing::info!("Session token stored");
        self.reconcile(token).await;
        Ok(())
    }

    /// Never fails; a token file that cannot be removed is only logged.
    pub fn logout(&self) {
        if let Err(e) = self.tokens.clear() {
            tracing::warn!("Failed to clear stored token: {}", e);
        }
        self.store.set_session(Session::default());
        tracing::info!("Logged out");
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::invalid("Email and password are required"));
        }
        let response = self.auth.login(email.trim(), password).await?;
        self.login(&response.access_token).await?;

        let mut session = self.store.get_session();
        if session.user.is_none() && session.token.as_deref() == Some(response.access_token.as_str()) {
            if let Some(user) = response.user {
                session.user = Some(user);
                self.store.set_session(session.clone());
            }
        }
        Ok(session)
    }

    /// Creates an account without logging in.
    pub async fn register(&self, form: &Registration) -> ApiResult<String> {
        form.validate().map_err(ApiError::Invalid)?;
        self.auth.register(form).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<String> {
        let message = self.auth.update_user(update).await?;
        if let Err(e) = self.refresh_user().await {
            tracing::warn!("Profile updated but user refresh failed: {}", e);
        }
        Ok(message)
    }

    pub async fn delete_account(&self) -> ApiResult<()> {
        self.auth.delete_user().await?;
        self.logout();
        Ok(())
    }

    pub async fn refresh_user(&self) -> ApiResult<User> {
        let token = self
            .store
            .get_session()
            .token
            .ok_or(ApiError::NotAuthenticated)?;
        let user = self.auth.current_user().await?;
        self.set_user_if_current(&token, user.clone());
        Ok(user)
    }

    async fn reconcile(&self, token: &str) {
        match self.auth.current_user().await {
            Ok(user) => {
                tracing::debug!("Session user resolved: {}", user.username);
                self.set_user_if_current(token, user);
            }
            Err(e) => tracing::warn!("Could not load user info: {}", e),
        }
    }

    // A logout or re-login during the fetch wins over its result.
    fn set_user_if_current(&self, token: &str, user: User) {
        let session = self.store.get_session();
        if session.token.as_deref() == Some(token) {
            self.store.set_session(Session {
                token: session.token,
                user: Some(user),
            });
        }
    }
}

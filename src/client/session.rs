//! Session Store
//!
//! Single source of truth for who is logged in. The current `Session` lives in
//! a `tokio::sync::watch` channel: the gateway reads the token from it, and the
//! realtime channel and conversation store subscribe to its changes.
//!
//! ```rust,no_run
//! # async fn example(store: teammatch::client::SessionStore) -> Result<(), teammatch::client::ClientError> {
//! let user = store.login("a@x.com", "pw").await?;
//! assert!(store.session().is_authenticated());
//! store.logout();
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use super::error::ClientError;
use super::gateway::ApiClient;
use super::storage::{PersistedSession, TokenStore};
use crate::shared::{AuthResponse, LoginRequest, RegisterForm, User};

const LOGIN_FALLBACK: &str = "Error al iniciar sesión";
const REGISTER_FALLBACK: &str = "Error en el registro";

/// A logged-in user and the token that proves it
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedSession {
    pub user: User,
    pub token: String,
}

/// Auth state. A token exists exactly when a user does.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(AuthenticatedSession),
}

impl Session {
    pub fn authenticated(user: User, token: impl Into<String>) -> Self {
        Session::Authenticated(AuthenticatedSession {
            user,
            token: token.into(),
        })
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated(auth) => Some(&auth.user),
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated(auth) => Some(&auth.token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    /// `(user id, token)`; a change here means a different live identity
    pub fn identity(&self) -> Option<(&str, &str)> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated(auth) => Some((auth.user.id.as_str(), auth.token.as_str())),
        }
    }
}

/// Shared, cheaply clonable view of the current session.
///
/// Besides the session itself it carries an epoch that moves whenever the
/// logged-in user changes (including to and from nobody), so per-user state
/// can tell synchronously that it belongs to someone else.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<Session>>,
    epoch: Arc<AtomicU64>,
    storage: Arc<Mutex<Option<Arc<dyn TokenStore>>>>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session", &*self.tx.borrow())
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::Anonymous);
        Self {
            tx: Arc::new(tx),
            epoch: Arc::new(AtomicU64::new(0)),
            storage: Arc::new(Mutex::new(None)),
        }
    }

    /// Snapshot of the current session
    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().token().map(str::to_string)
    }

    pub fn user(&self) -> Option<User> {
        self.tx.borrow().user().cloned()
    }

    pub fn user_id(&self) -> Option<String> {
        self.tx.borrow().user().map(|u| u.id.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    /// Bumped every time the logged-in user changes
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Receive every session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// End the session because the server rejected `token`.
    ///
    /// Does nothing if the session has meanwhile moved on to another token.
    /// Returns whether the session was ended.
    pub fn expire(&self, token: &str) -> bool {
        let ended = self.end(Some(token));
        if ended {
            tracing::info!("session token rejected, logging out");
            self.clear_storage();
        }
        ended
    }

    pub(crate) fn publish(&self, session: Session) {
        self.tx.send_modify(|current| {
            if current.user().map(|u| &u.id) != session.user().map(|u| &u.id) {
                self.epoch.fetch_add(1, Ordering::SeqCst);
            }
            *current = session;
        });
    }

    /// Publish `Anonymous` if a session is live (and holds `token`, when given)
    pub(crate) fn end(&self, token: Option<&str>) -> bool {
        self.tx.send_if_modified(|current| {
            let live = match (current.token(), token) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(current), Some(token)) => current == token,
            };
            if live {
                self.epoch.fetch_add(1, Ordering::SeqCst);
                *current = Session::Anonymous;
            }
            live
        })
    }

    pub(crate) fn attach_storage(&self, storage: Arc<dyn TokenStore>) {
        *self.storage.lock().unwrap_or_else(|p| p.into_inner()) = Some(storage);
    }

    pub(crate) fn clear_storage(&self) {
        let storage = self.storage.lock().unwrap_or_else(|p| p.into_inner()).clone();
        if let Some(storage) = storage {
            if let Err(e) = storage.clear() {
                tracing::warn!(error = %e, "failed to clear persisted session");
            }
        }
    }
}

/// Login, registration, restore and logout.
pub struct SessionStore {
    api: ApiClient,
    storage: Arc<dyn TokenStore>,
    session: SessionHandle,
}

impl SessionStore {
    pub fn new(api: ApiClient, storage: Arc<dyn TokenStore>, session: SessionHandle) -> Self {
        session.attach_storage(storage.clone());
        Self {
            api,
            storage,
            session,
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.session
    }

    pub fn session(&self) -> Session {
        self.session.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Exchange credentials for a session.
    ///
    /// On failure the current session is left untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self
            .api
            .post_credentials("/api/auth/login", &request)
            .await
            .map_err(|e| {
                tracing::info!(email, error = %e, "login failed");
                e.or_message(LOGIN_FALLBACK)
            })?;

        tracing::info!(user_id = %response.user.id, "logged in");
        Ok(self.establish(response))
    }

    /// Create an account and log into it. Blank required fields fail locally.
    pub async fn register(&self, form: &RegisterForm) -> Result<User, ClientError> {
        form.validate()?;

        let response: AuthResponse = self
            .api
            .post_credentials("/api/auth/register", form)
            .await
            .map_err(|e| {
                tracing::info!(email = %form.email, error = %e, "registration failed");
                e.or_message(REGISTER_FALLBACK)
            })?;

        tracing::info!(user_id = %response.user.id, "registered");
        Ok(self.establish(response))
    }

    /// Rebuild the session from the persisted token.
    ///
    /// Does nothing when a user is already in memory or nothing is persisted.
    /// Any failure clears the persisted token and leaves the session anonymous;
    /// the error is not surfaced because the user did not ask for this.
    pub async fn restore_session(&self) -> Result<Option<User>, ClientError> {
        if self.session.is_authenticated() {
            return Ok(self.session.user());
        }

        let persisted = match self.storage.load() {
            Ok(Some(persisted)) => persisted,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "could not read persisted session");
                return Ok(None);
            }
        };

        match self.api.fetch_me_with(&persisted.token).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "session restored");
                self.persist(&user, &persisted.token);
                self.session
                    .publish(Session::authenticated(user.clone(), persisted.token));
                Ok(Some(user))
            }
            Err(e) => {
                tracing::info!(error = %e, "persisted token rejected, clearing it");
                self.session.clear_storage();
                Ok(None)
            }
        }
    }

    /// Forget the session. Subscribers (the realtime channel) tear down on this change.
    pub fn logout(&self) {
        if let Some(user) = self.session.user() {
            tracing::info!(user_id = %user.id, "logging out");
        }
        self.session.end(None);
        self.session.clear_storage();
    }

    fn establish(&self, response: AuthResponse) -> User {
        let AuthResponse { user, token } = response;
        self.persist(&user, &token);
        self.session.publish(Session::authenticated(user.clone(), token));
        user
    }

    fn persist(&self, user: &User, token: &str) {
        let persisted = PersistedSession {
            token: token.to_string(),
            user: Some(user.clone()),
        };
        if let Err(e) = self.storage.save(&persisted) {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }
}

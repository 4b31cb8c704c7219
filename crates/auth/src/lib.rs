//! Supabase Auth (GoTrue) client for the Rocal admin dashboard
//!
//! Password sign-in, sign-out, token refresh, session persistence and a
//! broadcast stream of auth state changes.

mod session;

use log::{debug, info, warn};
use reqwest::{Client, Response, StatusCode};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub use session::{load_session, remove_session, save_session, Session, TokenClaims, User};

/// Refresh this many seconds before the access token expires
pub const REFRESH_MARGIN_SECS: i64 = 60;

const RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Pause after a successful refresh before the next one may start
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Errors raised by [`Auth`]
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API error: {0}")]
    ApiError(String),

    /// Rate limited or failing server; worth retrying
    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Session storage error: {0}")]
    Storage(std::io::Error),
}

impl AuthError {
    /// Message suitable for showing to the user.
    ///
    /// GoTrue answers with `{"error_description": ...}` or `{"msg": ...}`;
    /// the raw body is used when neither is present.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::ApiError(body) | AuthError::ServerError(_, body) => {
                serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| {
                        ["error_description", "msg", "message", "error"]
                            .iter()
                            .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
                    })
                    .unwrap_or_else(|| body.clone())
            }
            other => other.to_string(),
        }
    }
}

/// Client options
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub auto_refresh_token: bool,
    pub persist_session: bool,
    /// Where the session is persisted when `persist_session` is set
    pub storage_path: Option<PathBuf>,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
            storage_path: None,
        }
    }
}

impl AuthOptions {
    pub fn with_auto_refresh_token(mut self, value: bool) -> Self {
        self.auto_refresh_token = value;
        self
    }

    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }
}

/// Kind of auth state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Auth state change notification
#[derive(Debug, Clone)]
pub struct AuthStateChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

/// Auth client
pub struct Auth {
    url: String,
    key: String,
    http_client: Client,
    options: AuthOptions,
    current_session: Arc<RwLock<Option<Session>>>,
    state_change: broadcast::Sender<AuthStateChange>,
}

impl Auth {
    /// Create a new auth client for the project at `url`
    pub fn new(url: &str, key: &str, http_client: Client, options: AuthOptions) -> Self {
        let (state_change, _) = broadcast::channel(16);
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            http_client,
            options,
            current_session: Arc::new(RwLock::new(None)),
            state_change,
        }
    }

    /// Receive every auth state change from now on
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthStateChange> {
        self.state_change.subscribe()
    }

    /// Current session, if any
    pub fn get_session(&self) -> Option<Session> {
        match self.current_session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Access token of the current session
    pub fn access_token(&self) -> Option<String> {
        self.get_session().map(|s| s.access_token)
    }

    /// Install a session obtained elsewhere
    pub fn set_session(&self, session: Session) {
        self.store_session(Some(session), AuthChangeEvent::SignedIn);
    }

    fn store_session(&self, session: Option<Session>, event: AuthChangeEvent) {
        {
            let mut guard = match self.current_session.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = session.clone();
        }

        if self.options.persist_session {
            if let Some(path) = &self.options.storage_path {
                let result = match &session {
                    Some(s) => save_session(path, s),
                    None => remove_session(path),
                };
                if let Err(e) = result {
                    warn!("Failed to persist session to {}: {}", path.display(), e);
                }
            }
        }

        debug!("Auth state change: {:?}", event);
        // No receivers is fine
        let _ = self.state_change.send(AuthStateChange { event, session });
    }

    async fn token_request(
        &self,
        grant_type: &str,
        payload: serde_json::Value,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type={}", self.url, grant_type);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let session: Session = response.json().await?;
        Ok(session.stamped())
    }

    /// Sign in with email and password
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let session = self
            .token_request(
                "password",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;

        info!("Signed in as {}", session.user.id);
        self.store_session(Some(session.clone()), AuthChangeEvent::SignedIn);
        Ok(session)
    }

    /// Exchange the refresh token for a new session
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let current = self.get_session().ok_or(AuthError::MissingSession)?;

        let session = self
            .token_request(
                "refresh_token",
                serde_json::json!({ "refresh_token": current.refresh_token }),
            )
            .await?;

        debug!("Refreshed session for {}", session.user.id);
        self.store_session(Some(session.clone()), AuthChangeEvent::TokenRefreshed);
        Ok(session)
    }

    /// Fetch the user behind the current session
    pub async fn get_user(&self) -> Result<User, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;

        let url = format!("{}/auth/v1/user", self.url);

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Sign out.
    ///
    /// The local session is cleared even when the server call fails; that
    /// failure is still returned.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = match self.get_session() {
            Some(session) => self.revoke(&session.access_token).await,
            None => Ok(()),
        };

        self.store_session(None, AuthChangeEvent::SignedOut);
        result
    }

    async fn revoke(&self, access_token: &str) -> Result<(), AuthError> {
        let url = format!("{}/auth/v1/logout", self.url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Restore a persisted session and reconcile it with the server.
    ///
    /// An expired session is refreshed; a live one is checked against
    /// `/auth/v1/user`. A session the server rejects is discarded. Network
    /// failures leave the persisted session in place and are returned.
    pub async fn restore_session(&self) -> Result<Option<Session>, AuthError> {
        let persisted = match (&self.options.storage_path, self.options.persist_session) {
            (Some(path), true) => load_session(path)?,
            _ => self.get_session(),
        };

        let Some(session) = persisted else {
            self.store_session(None, AuthChangeEvent::InitialSession);
            return Ok(None);
        };

        {
            let mut guard = match self.current_session.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = Some(session.clone());
        }

        let reconciled = if session.is_expired(REFRESH_MARGIN_SECS) {
            self.refresh_session().await.map(Some)
        } else {
            self.get_user().await.map(|user| {
                let mut session = session;
                session.user = user;
                Some(session)
            })
        };

        match reconciled {
            Ok(session) => {
                self.store_session(session.clone(), AuthChangeEvent::InitialSession);
                Ok(session)
            }
            Err(AuthError::ApiError(body)) => {
                warn!("Persisted session rejected by server: {}", body);
                self.store_session(None, AuthChangeEvent::SignedOut);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Keep the session fresh in the background.
    ///
    /// Returns `None` when `auto_refresh_token` is off. Short-lived tokens
    /// are refreshed at half their lifetime. A refresh the server rejects
    /// signs the user out; rate limits, server faults and transport
    /// failures are retried.
    pub fn start_auto_refresh(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.options.auto_refresh_token {
            return None;
        }

        let auth = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut changes = auth.on_auth_state_change();
            loop {
                let wait = auth
                    .get_session()
                    .map(|s| s.seconds_until_refresh(s.refresh_margin(REFRESH_MARGIN_SECS)));

                match wait {
                    Some(Some(0)) => match auth.refresh_session().await {
                        Ok(_) => tokio::time::sleep(MIN_REFRESH_INTERVAL).await,
                        Err(AuthError::ApiError(body)) => {
                            warn!("Token refresh rejected: {}", body);
                            auth.store_session(None, AuthChangeEvent::SignedOut);
                        }
                        Err(e) => {
                            warn!("Token refresh failed, retrying: {}", e);
                            tokio::time::sleep(RETRY_INTERVAL).await;
                        }
                    },
                    Some(Some(secs)) => {
                        tokio::select! {
                            _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                            change = changes.recv() => {
                                if let Err(RecvError::Closed) = change {
                                    break;
                                }
                            }
                        }
                    }
                    // No session, or an expiry we cannot schedule against
                    Some(None) | None => match changes.recv().await {
                        Err(RecvError::Closed) => break,
                        _ => {}
                    },
                }
            }
        }))
    }
}

/// Classify a failed response. Rate limits and server faults are kept
/// apart from rejections so callers can retry them.
async fn api_error(response: Response) -> AuthError {
    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return AuthError::NetworkError(e),
    };
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        AuthError::ServerError(status.as_u16(), body)
    } else {
        AuthError::ApiError(body)
    }
}

//! Tracking who is signed in.
//!
//! [`SessionManager`] owns the reactive identity. It subscribes to the auth
//! provider's change events *before* asking for the current session, so a
//! change that lands while the initial lookup is in flight is never lost.
//! Everything else reads the identity through a cheap [`SessionHandle`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rocal_auth::{Auth, AuthError, AuthStateChange, Session};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::Identity;

/// A successful sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub identity: Identity,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Session> for SignedIn {
    fn from(session: &Session) -> Self {
        Self {
            identity: Identity::from(&session.user),
            expires_at: session
                .expires_at
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        }
    }
}

/// Why an auth operation did not succeed, worded for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub reason: String,
}

impl AuthFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for AuthFailure {}

impl From<AuthError> for AuthFailure {
    fn from(err: AuthError) -> Self {
        let reason = err.user_message();
        if reason.trim().is_empty() {
            Self::new("Invalid credentials")
        } else {
            Self::new(reason)
        }
    }
}

/// Stream of identity changes from a provider
#[async_trait]
pub trait SessionEvents: Send {
    /// The next change, `None` once the provider has gone away
    async fn next_change(&mut self) -> Option<Option<Identity>>;
}

#[async_trait]
impl SessionEvents for broadcast::Receiver<AuthStateChange> {
    async fn next_change(&mut self) -> Option<Option<Identity>> {
        loop {
            match self.recv().await {
                Ok(change) => {
                    debug!(event = ?change.event, "auth state change");
                    return Some(change.session.as_ref().map(|s| Identity::from(&s.user)));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "missed auth state changes");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[async_trait]
impl SessionEvents for broadcast::Receiver<Option<Identity>> {
    async fn next_change(&mut self) -> Option<Option<Identity>> {
        loop {
            match self.recv().await {
                Ok(identity) => return Some(identity),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "missed identity changes");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// The authentication backend as the dashboard needs it
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Session restored from storage or memory, if still valid
    async fn current_session(&self) -> Result<Option<SignedIn>, AuthFailure>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthFailure>;

    async fn sign_out(&self) -> Result<(), AuthFailure>;

    fn subscribe(&self) -> Box<dyn SessionEvents>;
}

#[async_trait]
impl SessionProvider for Auth {
    async fn current_session(&self) -> Result<Option<SignedIn>, AuthFailure> {
        match self.get_session() {
            Some(session) if !session.is_expired(0) => Ok(Some(SignedIn::from(&session))),
            _ => Ok(self.restore_session().await?.as_ref().map(SignedIn::from)),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthFailure> {
        let session = self.sign_in_with_password(email, password).await?;
        Ok(SignedIn::from(&session))
    }

    async fn sign_out(&self) -> Result<(), AuthFailure> {
        Auth::sign_out(self).await?;
        Ok(())
    }

    fn subscribe(&self) -> Box<dyn SessionEvents> {
        Box::new(self.on_auth_state_change())
    }
}

/// Read access to the current identity
#[derive(Debug, Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<Option<Identity>>,
}

impl SessionHandle {
    /// A handle that never changes
    pub fn fixed(identity: Option<Identity>) -> Self {
        let (_tx, rx) = watch::channel(identity);
        Self { rx }
    }

    pub fn current(&self) -> Option<Identity> {
        self.rx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Waits for the identity to change; `false` when the manager is gone
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Owns the identity and keeps it in step with the provider
pub struct SessionManager {
    provider: Arc<dyn SessionProvider>,
    identity: Arc<watch::Sender<Option<Identity>>>,
    listener: JoinHandle<()>,
}

impl SessionManager {
    /// Subscribes to provider changes, then reconciles with the current
    /// session. A failed lookup leaves the user signed out.
    pub async fn start(provider: Arc<dyn SessionProvider>) -> Self {
        let mut events = provider.subscribe();
        let (tx, _rx) = watch::channel(None);
        let identity = Arc::new(tx);

        let listener = {
            let identity = Arc::clone(&identity);
            tokio::spawn(async move {
                while let Some(change) = events.next_change().await {
                    identity.send_replace(change);
                }
                debug!("auth provider closed its event stream");
            })
        };

        match provider.current_session().await {
            Ok(Some(signed_in)) => {
                info!(user = %signed_in.identity.display_name(), "session restored");
                identity.send_replace(Some(signed_in.identity));
            }
            Ok(None) => debug!("no stored session"),
            Err(failure) => warn!(reason = %failure, "could not restore session"),
        }

        Self {
            provider,
            identity,
            listener,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            rx: self.identity.subscribe(),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    /// Signs in; failures come back as a reason, never as a panic
    pub async fn login(&self, email: &str, password: &str) -> Result<SignedIn, AuthFailure> {
        match self.provider.sign_in(email, password).await {
            Ok(signed_in) => {
                info!(user = %signed_in.identity.display_name(), "signed in");
                self.identity.send_replace(Some(signed_in.identity.clone()));
                Ok(signed_in)
            }
            Err(failure) => {
                warn!(reason = %failure, "sign in failed");
                Err(failure)
            }
        }
    }

    /// Signs out. The local identity is cleared even if the provider fails.
    pub async fn logout(&self) {
        if let Err(failure) = self.provider.sign_out().await {
            warn!(reason = %failure, "remote sign out failed");
        }
        self.identity.send_replace(None);
        info!("signed out");
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

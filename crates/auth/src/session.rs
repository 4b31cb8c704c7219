//! Session data and on-disk persistence

use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::AuthError;

/// Authenticated user as returned by GoTrue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub app_metadata: serde_json::Value,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Session data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Unix timestamp (seconds) at which the access token expires
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub token_type: String,
    pub user: User,
}

/// Subset of the access token claims the client cares about
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}

impl Session {
    /// Fill in `expires_at` when the server only sent `expires_in`
    pub(crate) fn stamped(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self
                .claims()
                .map(|claims| claims.exp)
                .ok()
                .or(Some(now_secs() + self.expires_in));
        }
        self
    }

    /// Decode the access token claims without verifying the signature.
    ///
    /// The token was issued to us by the server; only the server verifies it.
    pub fn claims(&self) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<TokenClaims>(
            &self.access_token,
            &DecodingKey::from_secret(&[]),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Whether the access token expires within `margin_secs`
    pub fn is_expired(&self, margin_secs: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now_secs() + margin_secs >= expires_at,
            None => false,
        }
    }

    /// Refresh margin for this token: at most `max_margin`, and never more
    /// than half of its lifetime
    pub fn refresh_margin(&self, max_margin: i64) -> i64 {
        max_margin.min(self.expires_in / 2).max(0)
    }

    /// Seconds to wait before refreshing, `None` if the expiry is unknown
    pub fn seconds_until_refresh(&self, margin_secs: i64) -> Option<u64> {
        self.expires_at
            .map(|expires_at| (expires_at - margin_secs - now_secs()).max(0) as u64)
    }
}

/// Read a persisted session, `None` if the file does not exist
pub fn load_session(path: &Path) -> Result<Option<Session>, AuthError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AuthError::Storage(e)),
    }
}

/// Persist a session as JSON, creating parent directories as needed
pub fn save_session(path: &Path, session: &Session) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(AuthError::Storage)?;
        }
    }
    let json = serde_json::to_vec_pretty(session)?;
    fs::write(path, json).map_err(AuthError::Storage)
}

/// Remove a persisted session; a missing file is not an error
pub fn remove_session(path: &Path) -> Result<(), AuthError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AuthError::Storage(e)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    pub(crate) fn token_for(sub: &str, exp: i64) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            &json!({ "sub": sub, "exp": exp, "aud": "authenticated", "role": "authenticated" }),
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    pub(crate) fn session(sub: &str, expires_at: Option<i64>) -> Session {
        Session {
            access_token: token_for(sub, expires_at.unwrap_or(now_secs() + 3600)),
            refresh_token: "refresh".to_string(),
            expires_in: 3600,
            expires_at,
            token_type: "bearer".to_string(),
            user: User {
                id: sub.to_string(),
                email: Some("admin@rocal.mx".to_string()),
                phone: None,
                role: Some("authenticated".to_string()),
                app_metadata: json!({}),
                user_metadata: json!({}),
                created_at: None,
                updated_at: None,
            },
        }
    }

    #[test]
    fn claims_are_read_without_signature_check() {
        let s = session("user-1", Some(2_000_000_000));
        let claims = s.claims().unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp, 2_000_000_000);
    }

    #[test]
    fn stamped_prefers_token_expiry() {
        let mut s = session("user-1", Some(2_000_000_000));
        s.expires_at = None;
        assert_eq!(s.stamped().expires_at, Some(2_000_000_000));
    }

    #[test]
    fn stamped_falls_back_to_expires_in() {
        let mut s = session("user-1", None);
        s.access_token = "not-a-jwt".to_string();
        let before = now_secs();
        let stamped = s.stamped();
        let expires_at = stamped.expires_at.unwrap();
        assert!(expires_at >= before + 3600 && expires_at <= now_secs() + 3600);
    }

    #[test]
    fn expiry_margin() {
        let s = session("user-1", Some(now_secs() + 30));
        assert!(s.is_expired(60));
        assert!(!s.is_expired(0));
        assert_eq!(s.seconds_until_refresh(60), Some(0));
    }

    #[test]
    fn short_lived_tokens_refresh_at_half_life() {
        let mut s = session("user-1", Some(now_secs() + 30));
        s.expires_in = 30;
        assert_eq!(s.refresh_margin(60), 15);
        assert!(s.seconds_until_refresh(s.refresh_margin(60)).unwrap() >= 14);

        s.expires_in = 3600;
        assert_eq!(s.refresh_margin(60), 60);
        s.expires_in = 0;
        assert_eq!(s.refresh_margin(60), 0);
    }

    #[test]
    fn persistence_round_trip_and_removal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        assert_eq!(load_session(&path).unwrap(), None);

        let s = session("user-1", Some(2_000_000_000));
        save_session(&path, &s).unwrap();
        assert_eq!(load_session(&path).unwrap(), Some(s));

        remove_session(&path).unwrap();
        remove_session(&path).unwrap();
        assert_eq!(load_session(&path).unwrap(), None);
    }
}

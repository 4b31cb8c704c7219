//! Configuration for the dashboard

use std::path::PathBuf;
use std::time::Duration;

use rocal_auth::AuthOptions;
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection and session settings.
///
/// Load it from the environment with [`DashboardConfig::from_env`]; a `.env`
/// file is honoured by the binary.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// The base URL of the Supabase project
    pub url: Url,

    /// The anonymous API key of the Supabase project
    pub anon_key: String,

    /// Where the signed-in session is kept between runs
    pub session_file: PathBuf,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Whether to refresh the access token in the background
    pub auto_refresh_token: bool,
}

impl DashboardConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(url_str: &str, anon_key: String) -> Result<Self> {
        let url = Url::parse(url_str)?;
        if anon_key.is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key,
            session_file: default_session_file(),
            request_timeout: Some(DEFAULT_TIMEOUT),
            auto_refresh_token: true,
        })
    }

    /// Reads `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `ROCAL_SESSION_FILE` and
    /// `ROCAL_REQUEST_TIMEOUT_SECS` (0 disables the timeout).
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = var("SUPABASE_URL")
            .ok_or_else(|| Error::config("SUPABASE_URL environment variable not found"))?;
        let anon_key = var("SUPABASE_ANON_KEY")
            .ok_or_else(|| Error::config("SUPABASE_ANON_KEY environment variable not found"))?;

        let mut config = Self::new(&url, anon_key)?;

        if let Some(path) = var("ROCAL_SESSION_FILE").filter(|p| !p.is_empty()) {
            config = config.with_session_file(path);
        }

        if let Some(secs) = var("ROCAL_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::config(format!("ROCAL_REQUEST_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            config = config.with_request_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }

        Ok(config)
    }

    /// Set the session file
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set whether to refresh the token in the background
    pub fn with_auto_refresh_token(mut self, value: bool) -> Self {
        self.auto_refresh_token = value;
        self
    }

    /// Project URL without the trailing slash `Url` adds
    pub fn base_url(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }

    /// HTTP client shared by the auth and table clients
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }

    /// Options for the auth client
    pub fn auth_options(&self) -> AuthOptions {
        AuthOptions::default()
            .with_auto_refresh_token(self.auto_refresh_token)
            .with_persist_session(true)
            .with_storage_path(&self.session_file)
    }
}

fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("rocal-admin").join("session.json"))
        .unwrap_or_else(|| PathBuf::from(".rocal-session.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_new_valid() {
        let config = DashboardConfig::new("http://localhost:54321", "anon".to_string()).unwrap();
        assert_eq!(config.url.to_string(), "http://localhost:54321/");
        assert_eq!(config.base_url(), "http://localhost:54321");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn config_new_invalid_url() {
        let config = DashboardConfig::new("not a valid url", "anon".to_string());
        assert!(matches!(config, Err(Error::Url(_))));
    }

    #[test]
    fn config_new_empty_key() {
        match DashboardConfig::new("http://localhost:54321", String::new()) {
            Err(Error::Config(msg)) => assert!(msg.contains("anon_key cannot be empty")),
            other => panic!("Expected Config error for empty key, got {:?}", other),
        }
    }

    #[test]
    fn from_vars_reads_optional_settings() {
        let config = DashboardConfig::from_vars(vars(&[
            ("SUPABASE_URL", "https://rocal.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("ROCAL_SESSION_FILE", "/tmp/rocal/session.json"),
            ("ROCAL_REQUEST_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.session_file, PathBuf::from("/tmp/rocal/session.json"));
        assert_eq!(config.request_timeout, None);
        assert_eq!(
            config.auth_options().storage_path,
            Some(PathBuf::from("/tmp/rocal/session.json"))
        );
    }

    #[test]
    fn from_vars_requires_url() {
        match DashboardConfig::from_vars(vars(&[("SUPABASE_ANON_KEY", "anon")])) {
            Err(Error::Config(msg)) => assert!(msg.contains("SUPABASE_URL")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn from_vars_rejects_bad_timeout() {
        let result = DashboardConfig::from_vars(vars(&[
            ("SUPABASE_URL", "https://rocal.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("ROCAL_REQUEST_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

//! Wiring of the Supabase-backed services

use std::sync::Arc;

use rocal_auth::Auth;
use tokio::task::JoinHandle;

use crate::config::DashboardConfig;
use crate::dashboard::DashboardController;
use crate::error::Result;
use crate::session::SessionManager;
use crate::store::SupabaseStore;

/// The dashboard's services sharing one HTTP client and one auth session
pub struct RocalAdmin {
    config: DashboardConfig,
    auth: Arc<Auth>,
    store: Arc<SupabaseStore>,
    session: SessionManager,
    refresher: Option<JoinHandle<()>>,
}

impl RocalAdmin {
    /// Connects to the project and restores any persisted session.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rocal_admin::{DashboardConfig, RocalAdmin};
    ///
    /// # async fn run() -> rocal_admin::Result<()> {
    /// let config = DashboardConfig::new("https://your-project.supabase.co", "anon-key".into())?;
    /// let app = RocalAdmin::connect(config).await?;
    /// let mut dashboard = app.dashboard();
    /// dashboard.load().await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: DashboardConfig) -> Result<Self> {
        let http_client = config.http_client()?;
        let auth = Arc::new(Auth::new(
            config.base_url(),
            &config.anon_key,
            http_client.clone(),
            config.auth_options(),
        ));
        let store = Arc::new(SupabaseStore::new(&config, http_client, Arc::clone(&auth)));
        let session = SessionManager::start(auth.clone()).await;
        let refresher = auth.start_auto_refresh();

        Ok(Self {
            config,
            auth,
            store,
            session,
            refresher,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn auth(&self) -> &Arc<Auth> {
        &self.auth
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn store(&self) -> Arc<SupabaseStore> {
        Arc::clone(&self.store)
    }

    /// A dashboard bound to this store and session
    pub fn dashboard(&self) -> DashboardController<SupabaseStore> {
        DashboardController::new(self.store(), self.session.handle())
    }
}

impl Drop for RocalAdmin {
    fn drop(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.abort();
        }
    }
}

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::auth::dto::User;
use crate::auth::services as auth_api;
use crate::auth::session::{SessionManager, SessionState};
use crate::cache::{QueryCache, QueryKey};
use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::http::ApiClient;
use crate::meals::dto::FoodEntry;
use crate::meals::services as meals_api;
use crate::reports::dto::{DailyReport, MonthlyReport, WeeklyReport};
use crate::reports::services as reports_api;
use crate::storage::{FileTokenStore, TokenStore};

/// How a query read treats cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// Serve cached data within its staleness window.
    IfStale,
    /// Always go to the server (focus, pull-to-refresh).
    Force,
}

/// Application context handed to every flow: config, session, HTTP client
/// and query cache.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session: Arc<SessionManager>,
    pub api: Arc<ApiClient>,
    pub cache: Arc<QueryCache>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let store = Arc::new(FileTokenStore::new(&config.token_dir)) as Arc<dyn TokenStore>;
        Self::from_parts(config, store)
    }

    pub fn from_parts(config: AppConfig, store: Arc<dyn TokenStore>) -> anyhow::Result<Self> {
        let session = Arc::new(SessionManager::new(store));
        let api = ApiClient::new(&config, Arc::clone(&session)).context("build api client")?;
        let cache = QueryCache::new(config.stale.clone());
        Ok(Self {
            config: Arc::new(config),
            session,
            api: Arc::new(api),
            cache: Arc::new(cache),
        })
    }

    /// Startup: resolve the persisted token, then load the signed-in user.
    pub async fn bootstrap(&self) -> SessionState {
        if self.session.init().await == SessionState::SignedIn {
            match self.current_user(Fetch::IfStale).await {
                Ok(user) => info!(user_id = %user.id, "session restored"),
                Err(e) => warn!(error = %e, "loading current user failed"),
            }
        }
        self.session.state()
    }

    /// Drops cached server data and the token. Never touches the network.
    pub async fn logout(&self) -> anyhow::Result<()> {
        self.cache.clear();
        self.session.sign_out().await?;
        info!("logged out");
        Ok(())
    }

    fn require_session(&self) -> ApiResult<()> {
        match self.session.state() {
            SessionState::SignedIn => Ok(()),
            _ => Err(ApiError::Unauthorized("Not authenticated".into())),
        }
    }

    pub async fn current_user(&self, mode: Fetch) -> ApiResult<User> {
        self.require_session()?;
        let api = &self.api;
        let key = QueryKey::CurrentUser;
        match mode {
            Fetch::IfStale => self.cache.fetch(key, || auth_api::me(api)).await,
            Fetch::Force => self.cache.refetch(key, || auth_api::me(api)).await,
        }
    }

    pub async fn food_entries(&self, start: &str, end: &str, mode: Fetch) -> ApiResult<Vec<FoodEntry>> {
        self.require_session()?;
        let api = &self.api;
        let key = QueryKey::food_entries(start, end);
        match mode {
            Fetch::IfStale => self.cache.fetch(key, || meals_api::entries(api, start, end)).await,
            Fetch::Force => self.cache.refetch(key, || meals_api::entries(api, start, end)).await,
        }
    }

    pub async fn daily_report(&self, date: &str, mode: Fetch) -> ApiResult<DailyReport> {
        self.require_session()?;
        let api = &self.api;
        let key = QueryKey::daily(date);
        match mode {
            Fetch::IfStale => self.cache.fetch(key, || reports_api::daily(api, date)).await,
            Fetch::Force => self.cache.refetch(key, || reports_api::daily(api, date)).await,
        }
    }

    pub async fn weekly_report(&self, mode: Fetch) -> ApiResult<WeeklyReport> {
        self.require_session()?;
        let api = &self.api;
        let key = QueryKey::WeeklyReport;
        match mode {
            Fetch::IfStale => self.cache.fetch(key, || reports_api::weekly(api)).await,
            Fetch::Force => self.cache.refetch(key, || reports_api::weekly(api)).await,
        }
    }

    pub async fn monthly_report(&self, year: i32, month: u8, mode: Fetch) -> ApiResult<MonthlyReport> {
        self.require_session()?;
        let api = &self.api;
        let key = QueryKey::MonthlyReport { year, month };
        match mode {
            Fetch::IfStale => {
                self.cache
                    .fetch(key, || reports_api::monthly(api, year, month))
                    .await
            }
            Fetch::Force => {
                self.cache
                    .refetch(key, || reports_api::monthly(api, year, month))
                    .await
            }
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Maximum age of cached data per resource before a read triggers a refetch.
#[derive(Debug, Clone, Deserialize)]
pub struct StaleConfig {
    pub user_secs: u64,
    pub entries_secs: u64,
    pub daily_secs: u64,
    pub weekly_secs: u64,
    pub monthly_secs: u64,
}

impl Default for StaleConfig {
    fn default() -> Self {
        Self {
            user_secs: 5 * 60,
            entries_secs: 60,
            daily_secs: 60,
            weekly_secs: 2 * 60,
            monthly_secs: 5 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api_url: String,
    pub token_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub analyze_timeout_secs: u64,
    pub stale: StaleConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url = std::env::var("API_URL").context("API_URL must be set")?;
        let defaults = StaleConfig::default();
        let stale = StaleConfig {
            user_secs: env_u64("STALE_USER_SECS").unwrap_or(defaults.user_secs),
            entries_secs: env_u64("STALE_ENTRIES_SECS").unwrap_or(defaults.entries_secs),
            daily_secs: env_u64("STALE_DAILY_SECS").unwrap_or(defaults.daily_secs),
            weekly_secs: env_u64("STALE_WEEKLY_SECS").unwrap_or(defaults.weekly_secs),
            monthly_secs: env_u64("STALE_MONTHLY_SECS").unwrap_or(defaults.monthly_secs),
        };
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token_dir: std::env::var("TOKEN_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".mealmind")),
            request_timeout_secs: env_u64("REQUEST_TIMEOUT_SECS").unwrap_or(30),
            analyze_timeout_secs: env_u64("ANALYZE_TIMEOUT_SECS").unwrap_or(120),
            stale,
        })
    }

    /// Config pointing at `api_url` with every other knob at its default.
    pub fn for_api(api_url: impl Into<String>, token_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token_dir: token_dir.into(),
            request_timeout_secs: 30,
            analyze_timeout_secs: 120,
            stale: StaleConfig::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn analyze_timeout(&self) -> Duration {
        Duration::from_secs(self.analyze_timeout_secs)
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stale_windows() {
        let stale = StaleConfig::default();
        assert_eq!(stale.user_secs, 300);
        assert_eq!(stale.entries_secs, 60);
        assert_eq!(stale.daily_secs, 60);
        assert_eq!(stale.weekly_secs, 120);
        assert_eq!(stale.monthly_secs, 300);
    }

    #[test]
    fn for_api_trims_trailing_slash() {
        let cfg = AppConfig::for_api("http://localhost:5000/api/", "/tmp/x");
        assert_eq!(cfg.api_url, "http://localhost:5000/api");
        assert_eq!(cfg.analyze_timeout(), Duration::from_secs(120));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
    }
}

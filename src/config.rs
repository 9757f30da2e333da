/// engine configuration
///
/// Loaded from a json file (or string) and optionally overridden from the
/// environment.  Missing persistence credentials are fatal at startup.
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{Tier, UserId};
use crate::error::{EngineError, Result};

/// env var that overrides `database_url`
pub const DATABASE_URL_ENV: &str = "CACHE_DATABASE_URL";

/// a year; longer refresh intervals are rejected
pub const MAX_REFRESH_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// persistence store connection string; required
    pub database_url: Option<String>,
    /// when false the full bootstrap and the steady reconciliation run once
    pub repeat_full_refresh: bool,
    pub refresh_interval_hours: u64,
    pub readiness_poll_secs: u64,
    pub reconcile_interval_secs: u64,
    /// rows a loader processes between cooperative yields
    pub rows_per_yield: usize,
    pub blocking_pool_size: usize,
    pub language_dir: PathBuf,
    pub languages: Vec<String>,
    /// ids whose tier is forced regardless of the external authority
    pub overrides: HashMap<UserId, Tier>,
    pub log_level: String,
    pub log_config: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_url: None,
            repeat_full_refresh: true,
            refresh_interval_hours: 12,
            readiness_poll_secs: 5,
            reconcile_interval_secs: 60 * 60,
            rows_per_yield: 32,
            blocking_pool_size: 4,
            language_dir: PathBuf::from("languages"),
            languages: vec!["en_us".to_string()],
            overrides: HashMap::new(),
            log_level: "info".to_string(),
            log_config: None,
        }
    }
}

impl EngineConfig {
    /// read and validate a json config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::FatalConfig(format!(
                "can't read config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        EngineConfig::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<EngineConfig> {
        let config: EngineConfig = serde_json::from_str(text)
            .map_err(|e| EngineError::FatalConfig(format!("invalid config: {}", e)))?;

        Ok(config)
    }

    /// apply environment overrides
    pub fn with_env(mut self) -> EngineConfig {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            self.database_url = Some(url);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.database_url.as_deref() {
            Some(url) if !url.trim().is_empty() => (),
            _ => {
                return Err(EngineError::FatalConfig(format!(
                    "no persistence store credentials; set database_url or {}",
                    DATABASE_URL_ENV
                )))
            }
        }

        if self.refresh_interval_hours == 0 || self.refresh_interval_hours > MAX_REFRESH_HOURS {
            return Err(EngineError::FatalConfig(format!(
                "refresh_interval_hours must be between 1 and {}",
                MAX_REFRESH_HOURS
            )));
        }
        if self.readiness_poll_secs == 0 || self.reconcile_interval_secs == 0 {
            return Err(EngineError::FatalConfig(
                "poll and reconcile intervals must be non-zero".to_string(),
            ));
        }
        if self.rows_per_yield == 0 || self.blocking_pool_size == 0 {
            return Err(EngineError::FatalConfig(
                "rows_per_yield and blocking_pool_size must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timings(&self) -> Timings {
        Timings {
            full_refresh: Duration::from_secs(self.refresh_interval_hours.saturating_mul(60 * 60)),
            readiness_poll: Duration::from_secs(self.readiness_poll_secs),
            reconcile: Duration::from_secs(self.reconcile_interval_secs),
            repeat: self.repeat_full_refresh,
        }
    }
}

/// the scheduler's clock settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub full_refresh: Duration,
    pub readiness_poll: Duration,
    pub reconcile: Duration,
    pub repeat: bool,
}

impl Default for Timings {
    fn default() -> Self {
        EngineConfig::default().timings()
    }
}

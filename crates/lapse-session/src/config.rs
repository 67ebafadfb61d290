//! Configuration for the session store.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default inactivity allowed before a session expires (15 minutes).
pub const DEFAULT_MAX_AGE_SECS: u64 = 900;

/// Configuration for an [`ExpiringStore`](crate::ExpiringStore).
///
/// Can be built in code or deserialized from a TOML table:
///
/// ```toml
/// max_age_secs = 1800
/// enable_purge_task = true
/// purge_interval_ms = 60000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum inactivity in seconds before a session's data expires.
    pub max_age_secs: u64,

    /// Whether to run the background purge task.
    /// If false, expired sessions stay in memory until `purge` is called,
    /// although reads already treat them as absent.
    pub enable_purge_task: bool,

    /// Interval between background purges in milliseconds.
    /// `None` purges once per `max_age_secs`.
    pub purge_interval_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            enable_purge_task: true,
            purge_interval_ms: None,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a TOML fragment.
    ///
    /// Missing fields take their default values. The result is validated.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the maximum inactivity, in seconds, before a session expires.
    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = secs;
        self
    }

    /// Enable or disable the background purge task.
    pub fn with_purge_task(mut self, enabled: bool) -> Self {
        self.enable_purge_task = enabled;
        self
    }

    /// Override the purge interval (defaults to the max age).
    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// Interval at which the background task purges expired sessions.
    pub fn purge_interval(&self) -> Duration {
        match self.purge_interval_ms {
            Some(ms) => Duration::from_millis(ms.max(1)),
            None => Duration::from_secs(self.max_age_secs.max(1)),
        }
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_age_secs == 0 {
            return Err(Error::Config("max_age_secs must be greater than zero".into()));
        }
        if self.max_age_secs > i64::MAX as u64 {
            return Err(Error::Config(format!(
                "max_age_secs {} is out of range",
                self.max_age_secs
            )));
        }
        if self.purge_interval_ms == Some(0) {
            return Err(Error::Config("purge_interval_ms must be greater than zero".into()));
        }
        Ok(())
    }
}

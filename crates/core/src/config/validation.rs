//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

const MAX_WORKERS_LIMIT: usize = 64;
const MIN_PROGRESS_INTERVAL_MS: u64 = 100;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_dir` is empty
    /// - `max_workers` is 0 or exceeds 64
    /// - `progress_interval_ms` is between 1 and 99
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_dir".into(), reason: "must not be empty".into() });
        }

        if self.max_workers == 0 {
            return Err(ConfigError::Invalid { field: "max_workers".into(), reason: "must be at least 1".into() });
        }
        if self.max_workers > MAX_WORKERS_LIMIT {
            return Err(ConfigError::Invalid {
                field: "max_workers".into(),
                reason: format!("must not exceed {MAX_WORKERS_LIMIT}"),
            });
        }

        if self.progress_interval_ms > 0 && self.progress_interval_ms < MIN_PROGRESS_INTERVAL_MS {
            return Err(ConfigError::Invalid {
                field: "progress_interval_ms".into(),
                reason: "must be 0 (disabled) or at least 100ms".into(),
            });
        }

        if self.cache_ttl_hours <= 0 {
            tracing::warn!(cache_ttl_hours = self.cache_ttl_hours, "cache expiry disabled; entries never expire");
        }

        Ok(())
    }
}

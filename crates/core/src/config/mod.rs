//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SITESCORE_*)
//! 2. TOML config file (if SITESCORE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::Ttl;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SITESCORE_*)
/// 2. TOML config file (if SITESCORE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory of the URL cache.
    ///
    /// Set via SITESCORE_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Cache TTL in hours. Zero or negative disables expiry.
    ///
    /// Set via SITESCORE_CACHE_TTL_HOURS environment variable.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: i64,

    /// Maximum number of URLs scored at once.
    ///
    /// Set via SITESCORE_MAX_WORKERS environment variable.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Interval between progress log lines in milliseconds; 0 disables them.
    ///
    /// Set via SITESCORE_PROGRESS_INTERVAL_MS environment variable.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Whether cache lookup deletes expired entry files it encounters.
    ///
    /// Set via SITESCORE_EVICT_EXPIRED_ON_LOOKUP environment variable.
    #[serde(default = "default_true")]
    pub evict_expired_on_lookup: bool,
}

fn default_cache_dir() -> PathBuf {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")));

    match base {
        Some(base) => base.join("sitescore"),
        None => PathBuf::from("./.sitescore-cache"),
    }
}

fn default_cache_ttl_hours() -> i64 {
    24
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}

fn default_progress_interval_ms() -> u64 {
    3_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_ttl_hours: default_cache_ttl_hours(),
            max_workers: default_max_workers(),
            progress_interval_ms: default_progress_interval_ms(),
            evict_expired_on_lookup: true,
        }
    }
}

impl AppConfig {
    pub fn ttl(&self) -> Ttl {
        Ttl::from_hours(self.cache_ttl_hours)
    }

    /// Progress interval as Duration, or None when disabled.
    pub fn progress_interval(&self) -> Option<Duration> {
        (self.progress_interval_ms > 0).then(|| Duration::from_millis(self.progress_interval_ms))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SITESCORE_`
    /// 2. TOML file from `SITESCORE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SITESCORE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SITESCORE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.cache_dir.ends_with("sitescore") || config.cache_dir.ends_with(".sitescore-cache"));
        assert_eq!(config.cache_ttl_hours, 24);
        assert!(config.max_workers >= 1);
        assert_eq!(config.progress_interval_ms, 3_000);
        assert!(config.evict_expired_on_lookup);
    }

    #[test]
    fn test_ttl_and_interval() {
        let config = AppConfig::default();
        assert_eq!(config.ttl(), Ttl::from_hours(24));
        assert_eq!(config.progress_interval(), Some(Duration::from_millis(3_000)));

        let config = AppConfig { cache_ttl_hours: 0, progress_interval_ms: 0, ..Default::default() };
        assert!(!config.ttl().expires());
        assert_eq!(config.progress_interval(), None);
    }

    #[test]
    fn test_load_layers_env_over_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("sitescore.toml", "cache_ttl_hours = 6\nmax_workers = 3\n")?;
            jail.set_env("SITESCORE_CONFIG_FILE", "sitescore.toml");
            jail.set_env("SITESCORE_MAX_WORKERS", "5");
            jail.set_env("SITESCORE_CACHE_DIR", "/var/cache/sitescore");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_ttl_hours, 6);
            assert_eq!(config.max_workers, 5);
            assert_eq!(config.cache_dir, PathBuf::from("/var/cache/sitescore"));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SITESCORE_MAX_WORKERS", "0");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_workers"));
            Ok(())
        });
    }
}

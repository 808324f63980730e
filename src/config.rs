//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{InvalidationStrategy, WarmupStrategy};
use crate::error::{CacheError, Result};

/// 100 MiB
pub const DEFAULT_MAX_MEMORY_BYTES: u64 = 100 * 1024 * 1024;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Memory ceiling that triggers eviction
    pub max_memory_bytes: u64,
    /// Default TTL in seconds for entries without explicit TTL, 0 for none
    pub default_expiration_seconds: u64,
    /// Staleness policy
    pub invalidation_strategy: InvalidationStrategy,
    /// Pre-loading policy used at startup
    pub warmup_strategy: WarmupStrategy,
    /// Expiry and cleanup sweep period in seconds
    pub maintenance_interval_seconds: u64,
    /// Auto-save period in seconds
    pub persistence_interval_seconds: u64,
    /// Whether snapshots are written periodically and on shutdown
    pub auto_persistence: bool,
    /// Snapshot file location
    pub persistence_path: Option<PathBuf>,
    /// Admin HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_MEMORY_BYTES` - Memory ceiling (default: 104857600)
    /// - `DEFAULT_EXPIRATION_SECONDS` - Default TTL, 0 for none (default: 3600)
    /// - `INVALIDATION_STRATEGY` - time_based, access_based, version_based, manual or smart (default: smart)
    /// - `WARMUP_STRATEGY` - no_warmup, popular_items, recent_items, predictive or full (default: popular_items)
    /// - `MAINTENANCE_INTERVAL_SECONDS` - Sweep frequency (default: 300)
    /// - `PERSISTENCE_INTERVAL_SECONDS` - Auto-save frequency (default: 600)
    /// - `AUTO_PERSISTENCE` - true or false (default: false)
    /// - `PERSISTENCE_PATH` - Snapshot file (default: platform cache dir)
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_memory_bytes: parse_var("MAX_MEMORY_BYTES").unwrap_or(defaults.max_memory_bytes),
            default_expiration_seconds: parse_var("DEFAULT_EXPIRATION_SECONDS")
                .unwrap_or(defaults.default_expiration_seconds),
            invalidation_strategy: parse_var("INVALIDATION_STRATEGY")
                .unwrap_or(defaults.invalidation_strategy),
            warmup_strategy: parse_var("WARMUP_STRATEGY").unwrap_or(defaults.warmup_strategy),
            maintenance_interval_seconds: parse_var("MAINTENANCE_INTERVAL_SECONDS")
                .unwrap_or(defaults.maintenance_interval_seconds),
            persistence_interval_seconds: parse_var("PERSISTENCE_INTERVAL_SECONDS")
                .unwrap_or(defaults.persistence_interval_seconds),
            auto_persistence: parse_var("AUTO_PERSISTENCE").unwrap_or(defaults.auto_persistence),
            persistence_path: env::var("PERSISTENCE_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .or(defaults.persistence_path),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    // == Validation ==
    /// Rejects settings the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_memory_bytes == 0 {
            return Err(CacheError::InvalidRequest(
                "max_memory_bytes must be greater than zero".to_string(),
            ));
        }
        if self.maintenance_interval_seconds == 0 || self.persistence_interval_seconds == 0 {
            return Err(CacheError::InvalidRequest(
                "maintenance and persistence intervals must be greater than zero".to_string(),
            ));
        }
        if self.auto_persistence && self.persistence_path.is_none() {
            return Err(CacheError::InvalidRequest(
                "auto persistence requires a persistence path".to_string(),
            ));
        }
        Ok(())
    }

    // == Durations ==
    pub fn default_expiration(&self) -> Duration {
        Duration::from_secs(self.default_expiration_seconds)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_seconds)
    }

    pub fn persistence_interval(&self) -> Duration {
        Duration::from_secs(self.persistence_interval_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            default_expiration_seconds: 3600,
            invalidation_strategy: InvalidationStrategy::default(),
            warmup_strategy: WarmupStrategy::default(),
            maintenance_interval_seconds: 300,
            persistence_interval_seconds: 600,
            auto_persistence: false,
            persistence_path: Some(default_persistence_path()),
            server_port: 3000,
        }
    }
}

/// `<platform cache dir>/media_cache/media_cache.json`, falling back to the
/// system temp dir.
pub fn default_persistence_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("media_cache")
        .join("media_cache.json")
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

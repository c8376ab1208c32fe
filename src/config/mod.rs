//! # Outbox Configuration System
//!
//! Typed configuration for the storage root, the primary datastore, the health
//! monitor and the drain loop.
//!
//! ## Sources
//!
//! Values are layered, later sources winning:
//!
//! 1. Built-in defaults ([`OutboxConfig::default`])
//! 2. Optional TOML file (`config/outbox.toml`, or `OUTBOX_CONFIG_PATH`)
//! 3. Environment variables, `OUTBOX_` prefix and `__` between sections,
//!    e.g. `OUTBOX_DATABASE__HOST=db.internal`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sentinel_outbox::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let batch_size = manager.config().drain.batch_size;
//! let window = manager.config().health.freshness_window();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::defaults;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OutboxConfig {
    /// Where queue records live on disk
    pub storage: StorageConfig,

    /// Primary datastore connection settings
    pub database: DatabaseConfig,

    /// Health cache and self-repair throttling
    pub health: HealthConfig,

    /// Periodic drain settings
    pub drain: DrainConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Access-denied storage root; records live in `<root_dir>/queue`
    pub root_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(defaults::STORAGE_ROOT),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    /// Database holding the platform schema; recreated by self-repair when missing
    pub database: String,
    pub username: String,
    pub password: String,
    pub connect_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            database: "sentinel".to_string(),
            username: "sentinel".to_string(),
            password: "sentinel".to_string(),
            connect_timeout_ms: defaults::PROBE_TIMEOUT_MS,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    /// How long a probe result is trusted without re-probing
    pub freshness_window_ms: u64,
    /// Upper bound on a single probe round-trip
    pub probe_timeout_ms: u64,
    /// Minimum spacing between self-repair attempts
    pub repair_interval_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            freshness_window_ms: defaults::FRESHNESS_WINDOW_MS,
            probe_timeout_ms: defaults::PROBE_TIMEOUT_MS,
            repair_interval_ms: defaults::REPAIR_INTERVAL_MS,
        }
    }
}

impl HealthConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_millis(self.freshness_window_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn repair_interval(&self) -> Duration {
        Duration::from_millis(self.repair_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DrainConfig {
    /// Maximum records replayed per type per pass
    pub batch_size: usize,
    /// Spacing between passes of the drain loop
    pub interval_seconds: u64,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::DRAIN_BATCH_SIZE,
            interval_seconds: defaults::DRAIN_INTERVAL_SECONDS,
        }
    }
}

impl DrainConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl OutboxConfig {
    /// Reject values that would make the outbox misbehave silently.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage.root_dir.as_os_str().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "storage.root_dir",
                "storage configuration",
            ));
        }
        if self.database.host.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "database.host",
                "database configuration",
            ));
        }
        if self.database.database.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "database.database",
                "database configuration",
            ));
        }
        if !self
            .database
            .database
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigurationError::invalid_value(
                "database.database",
                &self.database.database,
                "database names are limited to ASCII alphanumerics and '_'",
            ));
        }
        if self.health.freshness_window_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "health.freshness_window_ms",
                0,
                "must be greater than 0",
            ));
        }
        if self.health.probe_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "health.probe_timeout_ms",
                0,
                "must be greater than 0",
            ));
        }
        if self.drain.batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "drain.batch_size",
                0,
                "must be greater than 0",
            ));
        }
        if self.drain.interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "drain.interval_seconds",
                0,
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

//! Configuration Loader
//!
//! Builds an [`OutboxConfig`] from defaults, an optional TOML file and
//! `OUTBOX_*` environment variables using the `config` crate.

use super::error::{ConfigResult, ConfigurationError};
use super::OutboxConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config/outbox.toml";
const ENV_PREFIX: &str = "OUTBOX";
const CONFIG_PATH_VAR: &str = "OUTBOX_CONFIG_PATH";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: OutboxConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load configuration from the default file location (or `OUTBOX_CONFIG_PATH`)
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_path(&path)
    }

    /// Load configuration layering `path` (if present) and the environment over defaults
    pub fn load_from_path(path: &Path) -> ConfigResult<Arc<ConfigManager>> {
        debug!(path = %path.display(), "Loading outbox configuration");

        let defaults = config::Config::try_from(&OutboxConfig::default())?;
        let layered = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(path.to_path_buf()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::LoadError {
                source_description: path.display().to_string(),
                error: e.to_string(),
            })?;

        let config: OutboxConfig = layered.try_deserialize()?;
        Self::from_config(config, path.to_path_buf())
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: OutboxConfig, config_path: PathBuf) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;

        info!(
            config_path = %config_path.display(),
            storage_root = %config.storage.root_dir.display(),
            database_host = %config.database.host,
            database = %config.database.database,
            batch_size = config.drain.batch_size,
            "⚙️ Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            config_path,
        }))
    }

    pub fn config(&self) -> &OutboxConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Configuration as JSON with secrets masked, for debug output
    pub fn debug_config(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null);
        if let Some(password) = value
            .get_mut("database")
            .and_then(|db| db.get_mut("password"))
        {
            *password = serde_json::Value::String("***".to_string());
        }
        value
    }
}

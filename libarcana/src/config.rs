//! Configuration management for Arcana

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_NOTIFICATION_TTL: &str = "5s";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Time-to-live of a notification, in humantime notation ("5s", "1m")
    pub ttl: String,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = resolve_data_path()
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "~/.local/share/arcana".to_string());
        Self { data_dir }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_NOTIFICATION_TTL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// `ARCANA_CONFIG` must point at an existing file when set. Without it,
    /// a missing file at the XDG location yields the default configuration.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var("ARCANA_CONFIG")
            .ok()
            .map(|path| PathBuf::from(shellexpand::tilde(&path).to_string()));
        Self::load_from(explicit.as_deref())
    }

    /// Load from `explicit` if given, else from the XDG location
    ///
    /// `ARCANA_SERVICE_URL` overrides the service URL in either case.
    pub fn load_from(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let path = resolve_config_path()?;
                if path.exists() {
                    Self::load_from_path(&path)?
                } else {
                    tracing::debug!("No config at {}, using defaults", path.display());
                    Self::default_config()
                }
            }
        };

        if let Ok(url) = std::env::var("ARCANA_SERVICE_URL") {
            config.service.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            service: ServiceConfig::default(),
            storage: StorageConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }

    /// Check values that serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField("service.base_url".to_string()).into());
        }
        self.notification_ttl()?;
        Ok(())
    }

    /// Parsed notification time-to-live
    pub fn notification_ttl(&self) -> Result<Duration> {
        humantime::parse_duration(&self.notifications.ttl).map_err(|e| {
            ConfigError::InvalidValue {
                field: "notifications.ttl".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Request timeout for the reading service
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    /// Data directory with `~` expanded
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage.data_dir).to_string())
    }
}

/// Resolve the configuration file path following XDG Base Directory conventions
pub fn resolve_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("arcana").join("config.toml"))
}

/// Resolve the data directory path following XDG Base Directory conventions
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("arcana"))
}

use crate::credentials::DEFAULT_REFRESH_LIFETIME_DAYS;
use crate::credentials::file::default_credentials_path;
use crate::error::config::ConfigError;
use crate::{DEFAULT_API_BASE_URL, REFRESH_PATH};

use common::ErrorLocation;

use std::env;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

pub const CONFIG_FILE_NAME: &str = "client.toml";

pub const ENV_API_URL: &str = "DASHBOARD_API_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "DASHBOARD_API_TIMEOUT_SECS";
pub const ENV_CREDENTIALS_FILE: &str = "DASHBOARD_CREDENTIALS_FILE";

const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_REFRESH_LIFETIME_DAYS: u32 = 365;

// ============================================
// CONFIG STRUCT
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    #[serde(default = "default_refresh_lifetime_days")]
    pub refresh_lifetime_days: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            refresh_path: default_refresh_path(),
            refresh_lifetime_days: default_refresh_lifetime_days(),
            credentials_file: None,
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_refresh_path() -> String {
    REFRESH_PATH.to_string()
}
fn default_refresh_lifetime_days() -> u32 {
    DEFAULT_REFRESH_LIFETIME_DAYS
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ClientConfig {
    /// Load `{config_dir}/client.toml`, then apply environment overrides.
    ///
    /// A missing file is not an error: defaults are used. A `.env` file in the
    /// working directory is loaded first when present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed,
    /// an override is malformed, or the final values fail validation.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded .env from: {}", path.display());
        }

        let config_path = config_dir.join(CONFIG_FILE_NAME);

        let mut config = if config_path.exists() {
            let config = Self::load_from_path(&config_path)?;
            info!("Client config loaded from {}", config_path.display());
            config
        } else {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| {
            warn!("Failed to parse {}: {}", path.display(), e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })
    }

    /// Overlay `DASHBOARD_*` environment variables onto the loaded values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var(ENV_API_URL) {
            debug!("{ENV_API_URL} overrides base_url");
            self.base_url = url;
        }

        if let Ok(raw) = env::var(ENV_API_TIMEOUT_SECS) {
            self.timeout_secs = raw.trim().parse().map_err(|e| ConfigError::EnvError {
                location: ErrorLocation::from(Location::caller()),
                variable: ENV_API_TIMEOUT_SECS,
                reason: format!("'{raw}' is not a number of seconds: {e}"),
            })?;
        }

        if let Ok(path) = env::var(ENV_CREDENTIALS_FILE) {
            debug!("{ENV_CREDENTIALS_FILE} overrides credentials_file");
            self.credentials_file = Some(PathBuf::from(path));
        }

        Ok(())
    }

    /// Save config to `{config_dir}/client.toml` using atomic write.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, serialization or the write fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, contents).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Client config saved to {}", config_path.display());
        Ok(())
    }

    /// Write a default `client.toml` when `config_dir` has none yet.
    ///
    /// Returns `true` when a file was written. An existing file is never
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the default file cannot be written.
    pub fn write_default_if_missing(config_dir: &Path) -> Result<bool, ConfigError> {
        if config_dir.join(CONFIG_FILE_NAME).exists() {
            return Ok(false);
        }

        Self::default().save(config_dir)?;
        Ok(true)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            reason: format!("Invalid base_url '{}': {}", self.base_url, e),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("base_url must be http or https: {}", self.base_url),
            });
        }

        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid timeout: {}s (must be 1-{MAX_TIMEOUT_SECS})",
                    self.timeout_secs
                ),
            });
        }

        if self.refresh_path.trim_matches('/').is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "refresh_path cannot be empty".to_string(),
            });
        }

        if self.refresh_lifetime_days == 0
            || self.refresh_lifetime_days > MAX_REFRESH_LIFETIME_DAYS
        {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid refresh lifetime: {} days (must be 1-{MAX_REFRESH_LIFETIME_DAYS})",
                    self.refresh_lifetime_days
                ),
            });
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured credentials file, or the platform default.
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.credentials_file.clone().or_else(default_credentials_path)
    }
}

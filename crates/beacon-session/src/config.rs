//! Configuration for the session controller and the CLI.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file (`<config_dir>/beacon/config.toml` unless a path is given)
//! 3. Environment: `BEACON_HEARTBEAT_INTERVAL`, `BEACON_COLD_START_INTERVAL`
//!    (seconds, fractional allowed) and `BEACON_DATABASE_PATH`
//!
//! ```toml
//! [session]
//! heartbeat_interval_secs = 60
//! allowed_cold_start_interval_secs = 5
//! background_sessions = true
//!
//! [storage]
//! path = "/var/lib/beacon/beacon.sqlite"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use beacon_core::DEFAULT_ALLOWED_COLD_START_INTERVAL;
use beacon_storage::DEFAULT_DATABASE_FILE;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

/// Default heartbeat tick period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

pub const ENV_HEARTBEAT_INTERVAL: &str = "BEACON_HEARTBEAT_INTERVAL";
pub const ENV_COLD_START_INTERVAL: &str = "BEACON_COLD_START_INTERVAL";
pub const ENV_DATABASE_PATH: &str = "BEACON_DATABASE_PATH";

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Session Config
// ============================================================================

/// Settings consumed by the session controller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// How often an open session's `last_heartbeat_time` is refreshed.
    #[serde(rename = "heartbeat_interval_secs", deserialize_with = "secs")]
    pub heartbeat_interval: Duration,

    /// Tolerance after process launch within which a session start is cold.
    #[serde(rename = "allowed_cold_start_interval_secs", deserialize_with = "secs")]
    pub allowed_cold_start_interval: Duration,

    /// Whether backgrounding the app opens a background session
    /// (otherwise it only ends the foreground one).
    pub background_sessions: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            allowed_cold_start_interval: DEFAULT_ALLOWED_COLD_START_INTERVAL,
            background_sessions: true,
        }
    }
}

impl SessionConfig {
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_allowed_cold_start_interval(mut self, interval: Duration) -> Self {
        self.allowed_cold_start_interval = interval;
        self
    }

    pub fn with_background_sessions(mut self, enabled: bool) -> Self {
        self.background_sessions = enabled;
        self
    }

    /// Rejects settings the controller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::invalid(
                "heartbeat_interval_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn parse_secs(raw: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(raw).map_err(|e| format!("{raw}: {e}"))
}

fn secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    parse_secs(raw).map_err(serde::de::Error::custom)
}

// ============================================================================
// Storage Config
// ============================================================================

/// Where the record store lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Database file; `None` means the platform data directory.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolves the database file path.
    pub fn database_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("beacon"))
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DEFAULT_DATABASE_FILE)
        })
    }
}

// ============================================================================
// Top-level Config
// ============================================================================

/// Everything the `beacon` binary reads from its config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BeaconConfig {
    pub session: SessionConfig,
    pub storage: StorageConfig,
}

impl BeaconConfig {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("beacon").join("config.toml"))
    }

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.session.validate()?;
        Ok(config)
    }

    /// Loads configuration from file and process environment.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and a missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.session.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_toml_str(&contents)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(ENV_HEARTBEAT_INTERVAL) {
            self.session.heartbeat_interval = env_secs(ENV_HEARTBEAT_INTERVAL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_COLD_START_INTERVAL) {
            self.session.allowed_cold_start_interval = env_secs(ENV_COLD_START_INTERVAL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DATABASE_PATH) {
            self.storage.path = Some(PathBuf::from(raw));
        }
        Ok(())
    }
}

fn env_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| ConfigError::invalid(key, format!("{raw}: {e}")))?;
    parse_secs(value).map_err(|reason| ConfigError::invalid(key, reason))
}

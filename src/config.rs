use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during config operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

/// Persistent defaults for remote shell sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RshConfig {
    /// Shell started when no command is given
    #[serde(default = "default_shell")]
    pub default_shell: String,

    /// How long to wait for a workload to have a ready pod, in seconds
    #[serde(default = "default_pod_timeout_secs")]
    pub pod_timeout_secs: u64,

    /// Interval between pod readiness checks, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

fn default_pod_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for RshConfig {
    fn default() -> Self {
        Self {
            default_shell: default_shell(),
            pod_timeout_secs: default_pod_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl RshConfig {
    /// Get the configuration file path (~/.config/kubersh/config.json on Linux)
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join("kubersh");
        Ok(config_dir.join("config.json"))
    }

    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Ok(path) => Self::load_from(&path),
            Err(ConfigError::ConfigDirNotFound) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;

        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Resolve the settings for one invocation, applying command-line overrides
    pub fn settings(&self, shell: Option<String>, pod_timeout_secs: Option<u64>) -> Settings {
        Settings {
            default_shell: shell.unwrap_or_else(|| self.default_shell.clone()),
            pod_timeout: Duration::from_secs(pod_timeout_secs.unwrap_or(self.pod_timeout_secs)),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }
}

/// Effective settings handed to session assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub default_shell: String,
    pub pod_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        RshConfig::default().settings(None, None)
    }
}

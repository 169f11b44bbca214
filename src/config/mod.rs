//! Configuration management for teerank
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::codec::DEFAULT_MAX_CLIENTS;
use crate::storage::path::{DEFAULT_MAX_PATH_LEN, SERVERS_DIR};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record storage configuration
    pub storage: StorageConfig,

    /// Poll scheduling configuration
    pub polling: PollingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Record storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database root; records live under `<root>/servers`
    pub root: PathBuf,

    /// Maximum number of clients per server record
    pub max_clients: usize,

    /// Maximum record path length, including the NUL terminator
    pub max_path_len: usize,
}

/// Poll scheduling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Longest retry interval for an unreachable server, in seconds
    pub failure_backoff_cap_secs: u64,

    /// Shortest re-poll delay after a successful poll, in seconds
    pub jitter_min_secs: u64,

    /// Exclusive upper bound of the re-poll delay, in seconds
    pub jitter_max_secs: u64,

    /// Maximum number of servers polled at once
    pub max_concurrent_polls: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".teerank"),
            max_clients: DEFAULT_MAX_CLIENTS,
            max_path_len: DEFAULT_MAX_PATH_LEN,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            failure_backoff_cap_secs: 2 * 3600,
            jitter_min_secs: 1800,
            jitter_max_secs: 5400,
            max_concurrent_polls: 8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).as_deref(),
        Ok("1") | Ok("true") | Ok("yes") | Ok("on")
    )
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let root = std::env::var("TEERANK_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage.root);

        let max_clients =
            env_parse::<usize>("TEERANK_MAX_CLIENTS").unwrap_or(defaults.storage.max_clients);

        let max_path_len =
            env_parse::<usize>("TEERANK_MAX_PATH_LEN").unwrap_or(defaults.storage.max_path_len);

        let failure_backoff_cap_secs = env_parse::<u64>("TEERANK_FAILURE_BACKOFF_CAP")
            .unwrap_or(defaults.polling.failure_backoff_cap_secs);

        let jitter_min_secs =
            env_parse::<u64>("TEERANK_JITTER_MIN").unwrap_or(defaults.polling.jitter_min_secs);

        let jitter_max_secs =
            env_parse::<u64>("TEERANK_JITTER_MAX").unwrap_or(defaults.polling.jitter_max_secs);

        let max_concurrent_polls = env_parse::<usize>("TEERANK_MAX_CONCURRENT_POLLS")
            .unwrap_or(defaults.polling.max_concurrent_polls);

        // Legacy switches win over the explicit level
        let log_level = if env_flag("TEERANK_DEBUG") {
            String::from("trace")
        } else if env_flag("TEERANK_VERBOSE") {
            String::from("debug")
        } else {
            std::env::var("TEERANK_LOG_LEVEL").unwrap_or(defaults.logging.level)
        };

        let log_format =
            std::env::var("TEERANK_LOG_FORMAT").unwrap_or(defaults.logging.format);

        Ok(Self {
            storage: StorageConfig {
                root,
                max_clients,
                max_path_len,
            },
            polling: PollingConfig {
                failure_backoff_cap_secs,
                jitter_min_secs,
                jitter_max_secs,
                max_concurrent_polls,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.storage.root.as_os_str().is_empty() {
            anyhow::bail!("storage root must not be empty");
        }

        if self.storage.max_clients == 0 {
            anyhow::bail!("max_clients must be greater than 0");
        }

        if self.storage.max_path_len == 0 {
            anyhow::bail!("max_path_len must be greater than 0");
        }

        if self.polling.failure_backoff_cap_secs == 0 {
            anyhow::bail!("failure_backoff_cap_secs must be greater than 0");
        }

        if self.polling.jitter_min_secs >= self.polling.jitter_max_secs {
            anyhow::bail!(
                "jitter_min_secs ({}) must be lower than jitter_max_secs ({})",
                self.polling.jitter_min_secs,
                self.polling.jitter_max_secs
            );
        }

        if self.polling.max_concurrent_polls == 0 {
            anyhow::bail!("max_concurrent_polls must be greater than 0");
        }

        Ok(())
    }

    /// Directory holding one record per server
    #[must_use]
    pub fn servers_dir(&self) -> PathBuf {
        self.storage.root.join(SERVERS_DIR)
    }
}

//! # Runtime Configuration
//!
//! Loaded from an optional TOML file, then overridden from the environment.
//!
//! ## Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `SK_CONFIG` | Path of the TOML file |
//! | `SK_PRODUCT_IDS` | Comma-separated product identifiers |
//! | `SK_DATA_DIR` | Directory for the persisted consumable log |
//! | `SK_REFRESH_SECS` | Foreground refresh period, 0 disables |

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use store_manager::StoreConfig;
use thiserror::Error;
use tracing::warn;

/// Default foreground refresh period.
pub const DEFAULT_REFRESH_SECS: u64 = 60;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {error}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        error: String,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Store manager settings.
    pub store: StoreConfig,
    /// Seconds between foreground refreshes. 0 disables the ticker.
    pub foreground_refresh_secs: u64,
    /// Products the demo purchases after startup.
    pub demo_purchases: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            foreground_refresh_secs: DEFAULT_REFRESH_SECS,
            demo_purchases: Vec::new(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from `SK_CONFIG` if set, then apply environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("SK_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ids) = lookup("SK_PRODUCT_IDS") {
            self.store.product_identifiers = ids
                .split(',')
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();
        }

        if let Some(dir) = lookup("SK_DATA_DIR") {
            self.store.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(secs) = lookup("SK_REFRESH_SECS") {
            match secs.parse() {
                Ok(secs) => self.foreground_refresh_secs = secs,
                Err(_) => warn!("SK_REFRESH_SECS must be a whole number of seconds: {}", secs),
            }
        }
    }
}

//! Recovery engine configuration.
//!
//! Policy knobs (history bound, retry window, default quota) loaded from
//! TOML with built-in defaults matching the engine constants, so behavior
//! is unchanged when no config file is present.
//!
//! ## Loading Order
//!
//! 1. `SELFHEAL_CONFIG` environment variable (path to TOML file)
//! 2. `recovery.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is passed explicitly to
//! [`RecoveryCoordinator::new`](crate::recovery::RecoveryCoordinator::new)
//! rather than held in a global — tests construct fresh instances per test.

pub mod defaults;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Root configuration for the recovery engine.
///
/// Every field has a `#[serde(default)]` matching the constants in
/// [`defaults`], so a partial file only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Maximum retained recovery attempts (global FIFO bound).
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Trailing retry-quota window in seconds.
    #[serde(default = "default_retry_window_secs")]
    pub retry_window_secs: i64,

    /// Attempt quota for actions registered without an explicit one.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,
}

fn default_max_history() -> usize {
    defaults::MAX_HISTORY
}

fn default_retry_window_secs() -> i64 {
    defaults::RETRY_WINDOW_SECS
}

fn default_max_attempts() -> u32 {
    defaults::DEFAULT_MAX_ATTEMPTS
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            retry_window_secs: default_retry_window_secs(),
            default_max_attempts: default_max_attempts(),
        }
    }
}

impl RecoveryConfig {
    /// Load configuration using the standard search order:
    /// 1. `$SELFHEAL_CONFIG` environment variable
    /// 2. `./recovery.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("SELFHEAL_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded recovery config from SELFHEAL_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from SELFHEAL_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "SELFHEAL_CONFIG points to non-existent file, falling back");
            }
        }

        let local = Path::new("recovery.toml");
        if local.exists() {
            match Self::load_from_file(local) {
                Ok(config) => {
                    info!(path = %local.display(), "Loaded recovery config from working directory");
                    return config;
                }
                Err(e) => {
                    warn!(path = %local.display(), error = %e, "Failed to load local config, using defaults");
                }
            }
        }

        info!("No recovery config file found — using built-in defaults");
        Self::default()
    }

    /// Load and validate a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate();
        Ok(config)
    }

    /// Clamp out-of-range values back to safe minimums, warning on each.
    ///
    /// A zero history bound or zero-length window would silently disable the
    /// quota machinery, which is never what an operator meant.
    pub fn validate(&mut self) {
        if self.max_history == 0 {
            warn!(
                configured = self.max_history,
                fallback = defaults::MAX_HISTORY,
                "max_history must be at least 1 — using default"
            );
            self.max_history = defaults::MAX_HISTORY;
        }
        if self.retry_window_secs < 1 {
            warn!(
                configured = self.retry_window_secs,
                fallback = defaults::RETRY_WINDOW_SECS,
                "retry_window_secs must be at least 1 — using default"
            );
            self.retry_window_secs = defaults::RETRY_WINDOW_SECS;
        }
        if self.default_max_attempts == 0 {
            warn!(
                configured = self.default_max_attempts,
                fallback = defaults::DEFAULT_MAX_ATTEMPTS,
                "default_max_attempts must be at least 1 — using default"
            );
            self.default_max_attempts = defaults::DEFAULT_MAX_ATTEMPTS;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let config = RecoveryConfig::default();
        assert_eq!(config.max_history, 50);
        assert_eq!(config.retry_window_secs, 3_600);
        assert_eq!(config.default_max_attempts, 3);
    }

    #[test]
    fn partial_toml_only_overrides_named_fields() {
        let config: RecoveryConfig = toml::from_str("max_history = 10").unwrap();
        assert_eq!(config.max_history, 10);
        assert_eq!(config.retry_window_secs, defaults::RETRY_WINDOW_SECS);
        assert_eq!(config.default_max_attempts, defaults::DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn validate_clamps_zeroes_to_defaults() {
        let mut config: RecoveryConfig =
            toml::from_str("max_history = 0\nretry_window_secs = 0\ndefault_max_attempts = 0")
                .unwrap();
        config.validate();
        assert_eq!(config.max_history, defaults::MAX_HISTORY);
        assert_eq!(config.retry_window_secs, defaults::RETRY_WINDOW_SECS);
        assert_eq!(config.default_max_attempts, defaults::DEFAULT_MAX_ATTEMPTS);
    }
}

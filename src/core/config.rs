//! core::config
//!
//! Run configuration.
//!
//! # Location
//!
//! Loaded from (in order of precedence):
//! 1. `$DRIFTSCAN_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/driftscan/config.toml`
//! 3. `~/.config/driftscan/config.toml`
//!
//! A missing file yields the defaults; a malformed file is an error.
//!
//! # Validation
//!
//! Values are validated after parsing. The defaults are sized to stay well
//! under GitHub's per-hour budget even with every worker active.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config at {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown fields.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        /// Path that failed
        path: PathBuf,
        /// Underlying TOML error
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Tunables for a single run.
///
/// # Example
///
/// ```toml
/// concurrency = 20
/// rate_safety_margin = 25
/// retry_max_attempts = 3
/// retry_base_delay_ms = 500
/// max_search_results = 1000
/// reachability_retries = 2
/// api_base = "https://api.github.com"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Maximum repositories processed in parallel.
    pub concurrency: usize,

    /// Workers pause once the remaining request budget drops to this value.
    pub rate_safety_margin: u64,

    /// Attempts per request for transient failures (including the first).
    pub retry_max_attempts: u32,

    /// Base delay for exponential backoff between attempts.
    pub retry_base_delay_ms: u64,

    /// Cap on merged-PR search results per repository.
    pub max_search_results: usize,

    /// Extra attempts for a single PR's reachability check.
    pub reachability_retries: u32,

    /// API base URL (configurable for GitHub Enterprise).
    pub api_base: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 20,
            rate_safety_margin: 25,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
            max_search_results: 1000,
            reachability_retries: 2,
            api_base: "https://api.github.com".to_string(),
        }
    }
}

impl RunConfig {
    /// Load configuration from the canonical locations, falling back to
    /// defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate configuration from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "retry_max_attempts must be at least 1".into(),
            ));
        }
        if self.max_search_results == 0 {
            return Err(ConfigError::InvalidValue(
                "max_search_results must be at least 1".into(),
            ));
        }
        if self.api_base.is_empty() {
            return Err(ConfigError::InvalidValue("api_base must not be empty".into()));
        }
        Ok(())
    }
}

/// Resolve the config file path from the canonical locations.
fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("DRIFTSCAN_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("driftscan").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.concurrency, 20);
        assert_eq!(config.api_base, "https://api.github.com");
    }

    #[test]
    fn load_from_parses_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "concurrency = 5\nrate_safety_margin = 10").unwrap();

        let config = RunConfig::load_from(file.path()).unwrap();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.rate_safety_margin, 10);
        // Unspecified fields keep their defaults
        assert_eq!(config.retry_max_attempts, 3);
    }

    #[test]
    fn load_from_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "concurency = 5").unwrap();

        assert!(matches!(
            RunConfig::load_from(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let config = RunConfig {
            concurrency: 0,
            ..RunConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}

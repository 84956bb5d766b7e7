//! Map configuration via TOML
//!
//! Every key is optional; a missing key falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use txmap_core::{Error, Result};

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "txmap.toml";

/// Map configuration
///
/// # Example
///
/// ```toml
/// # Upper bound on one wait between lock acquisition retries, in milliseconds
/// lock_backoff_ms = 10
///
/// # Initial capacity of the transaction -> context map
/// executor_capacity = 128
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapConfig {
    /// Lock backoff interval in milliseconds; must be non-zero
    #[serde(default = "default_lock_backoff_ms")]
    pub lock_backoff_ms: u64,
    /// Initial capacity of the transaction -> context map
    #[serde(default = "default_executor_capacity")]
    pub executor_capacity: usize,
}

fn default_lock_backoff_ms() -> u64 {
    10
}

fn default_executor_capacity() -> usize {
    128
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            lock_backoff_ms: default_lock_backoff_ms(),
            executor_capacity: default_executor_capacity(),
        }
    }
}

impl MapConfig {
    /// Parse and validate TOML
    ///
    /// # Errors
    /// `Config` on malformed TOML, unknown keys or a zero backoff.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MapConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `Io` if the file cannot be read, otherwise as [`MapConfig::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `Config` if `lock_backoff_ms` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.lock_backoff_ms == 0 {
            return Err(Error::Config(
                "lock_backoff_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Lock backoff as a Duration
    pub fn lock_backoff(&self) -> Duration {
        Duration::from_millis(self.lock_backoff_ms)
    }

    /// Default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# txmap configuration
#
# Upper bound on one wait between lock acquisition retries, in milliseconds
lock_backoff_ms = 10

# Initial capacity of the transaction -> context map
executor_capacity = 128
"#
    }
}

//! Configuration for xcgraph
//!
//! Settings live in a TOML file that is optional: every field has a default and a
//! missing file yields the default configuration.
//!
//! # Location
//!
//! - `XCGRAPH_CONFIG` if set
//! - `~/.xcgraph/config.toml` otherwise
//!
//! ```toml
//! [cache]
//! # Keep source targets replaced by cached binaries, tagged `binary-sources`
//! keep_source_targets = false
//! # Upper bound of artifacts loaded in parallel
//! max_concurrent_loads = 8
//! ```
//!
//! # Environment Overrides
//!
//! [`GraphConfig::apply_env_overrides`] reads:
//! - `XCGRAPH_MAX_CONCURRENT_LOADS`
//! - `XCGRAPH_KEEP_SOURCE_TARGETS` (`true`/`false`, `1`/`0`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::core::GraphError;

/// Environment variable pointing at the configuration file.
pub const CONFIG_PATH_ENV: &str = "XCGRAPH_CONFIG";
/// Environment variable overriding [`CacheSettings::max_concurrent_loads`].
pub const MAX_CONCURRENT_LOADS_ENV: &str = "XCGRAPH_MAX_CONCURRENT_LOADS";
/// Environment variable overriding [`CacheSettings::keep_source_targets`].
pub const KEEP_SOURCE_TARGETS_ENV: &str = "XCGRAPH_KEEP_SOURCE_TARGETS";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Binary cache substitution
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Settings of the cache graph mutator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Keep replaced targets in the graph, without dependencies, instead of
    /// removing them
    #[serde(default)]
    pub keep_source_targets: bool,

    /// Maximum number of artifacts loaded concurrently
    #[serde(default = "default_max_concurrent_loads")]
    pub max_concurrent_loads: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            keep_source_targets: false,
            max_concurrent_loads: default_max_concurrent_loads(),
        }
    }
}

fn default_max_concurrent_loads() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

impl GraphConfig {
    /// Load the configuration from [`GraphConfig::default_path`], falling back to
    /// defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The default path cannot be determined
    /// - The file exists but cannot be read or parsed
    /// - The loaded values are invalid
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load and validate the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingFile`] if there is no file at `path`, and an
    /// error if the file cannot be read, is not valid TOML, or holds invalid values.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GraphError::MissingFile {
                path: path.to_path_buf(),
            }
            .into());
        }
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .map_err(GraphError::TomlError)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem operation fails.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Path of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if `XCGRAPH_CONFIG` is unset and the home directory
    /// cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".xcgraph")
            .join("config.toml"))
    }

    /// Apply overrides from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConfigError`] if a variable holds an unparseable
    /// value or the result is invalid.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var(MAX_CONCURRENT_LOADS_ENV) {
            self.cache.max_concurrent_loads =
                value.trim().parse().map_err(|_| GraphError::ConfigError {
                    message: format!("{MAX_CONCURRENT_LOADS_ENV} must be a number, got '{value}'"),
                })?;
        }
        if let Ok(value) = std::env::var(KEEP_SOURCE_TARGETS_ENV) {
            self.cache.keep_source_targets = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(GraphError::ConfigError {
                        message: format!(
                            "{KEEP_SOURCE_TARGETS_ENV} must be true or false, got '{value}'"
                        ),
                    }
                    .into());
                }
            };
        }
        self.validate()
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConfigError`] if `max_concurrent_loads` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_concurrent_loads == 0 {
            return Err(GraphError::ConfigError {
                message: "cache.max_concurrent_loads must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

//! memctl Configuration
//!
//! Locations of the two host memory sources. Defaults match the board
//! layout; a TOML file or environment variables can point elsewhere.

use memctl_sys::{DEVICE_PATH, PROCFS_PATH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overrides `device_path`
pub const ENV_DEVICE: &str = "MEMCTL_DEVICE";
/// Overrides `procfs_path`
pub const ENV_PROCFS: &str = "MEMCTL_PROCFS";

/// Source locations for system memory queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemctlConfig {
    /// Misc device answering heap/page control codes
    pub device_path: PathBuf,
    /// Media memory pseudo-file
    pub procfs_path: PathBuf,
}

impl Default for MemctlConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEVICE_PATH),
            procfs_path: PathBuf::from(PROCFS_PATH),
        }
    }
}

impl MemctlConfig {
    /// Load from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Apply `MEMCTL_DEVICE` / `MEMCTL_PROCFS` if set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(path) = env_path(ENV_DEVICE) {
            self.device_path = path;
        }
        if let Some(path) = env_path(ENV_PROCFS) {
            self.procfs_path = path;
        }
        self
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("device_path"));
        }
        if self.procfs_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("procfs_path"));
        }
        Ok(())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("{0} must not be empty")]
    EmptyPath(&'static str),
}

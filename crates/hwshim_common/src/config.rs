//! Daemon configuration.
//!
//! Config file: /etc/hwshim/config.toml
//!
//! Only ambient daemon concerns live here. The profile root is fixed and is
//! deliberately not configurable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Export port configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory the endpoints are materialized under
    #[serde(default = "default_export_root")]
    pub root: PathBuf,
}

fn default_export_root() -> PathBuf {
    PathBuf::from("/run/hwshim")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            root: default_export_root(),
        }
    }
}

impl ExportConfig {
    pub fn status_path(&self) -> PathBuf {
        self.root.join("status.json")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HwshimConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

impl HwshimConfig {
    /// Get system config path: /etc/hwshim/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/hwshim/config.toml")
    }

    /// Load the system config, or defaults when it does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::system_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: HwshimConfig = toml::from_str(contents)?;
        if config.logging.level.trim().is_empty() {
            anyhow::bail!("logging.level must not be empty");
        }
        Ok(config)
    }
}

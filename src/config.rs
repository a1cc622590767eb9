//! Configuration management for the ratepolicy command line tool.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PolicyError, Result};
use crate::policy::DEFAULT_DOMAIN;

/// Main configuration for ratepolicy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Policy loading configuration
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where policies come from and how requests pick a domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Path to the policy document
    pub rules_path: Option<PathBuf>,

    /// Domain used when a request does not name one
    #[serde(default = "default_domain")]
    pub default_domain: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            default_domain: default_domain(),
        }
    }
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "ratepolicy=info".to_string()
}

impl AppConfig {
    /// Load configuration from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| PolicyError::Config(e.to_string()))
    }
}

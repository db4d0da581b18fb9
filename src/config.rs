//! YAML configuration file support.
//!
//! A single YAML document describes the hasher and the integration budget of
//! the collision probability model.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "embeddings-768"
//!
//! hasher:
//!   r: 4.0
//!   dim: 768
//!   metric_dim: 2
//!   seed: 1
//!   num_perm: 1024
//!   use_parallel: true
//!
//! integration:
//!   tolerance: 1.49e-8
//!   max_depth: 50
//!   max_evaluations: 1000000
//! ```
//!
//! `metric_dim`, `seed`, `num_perm` and `use_parallel` may be omitted, as may
//! the whole `integration` section.

use std::fs;
use std::path::Path;

use pstable::{HasherConfig, IntegrationConfig, PStableError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid {section} config: {source}")]
    Invalid {
        section: &'static str,
        source: PStableError,
    },
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct LshConfigFile {
    /// Configuration format version.
    pub version: String,

    /// Optional configuration name/description.
    #[serde(default)]
    pub name: Option<String>,

    /// Hasher configuration.
    pub hasher: HasherConfig,

    /// Integration budget of the collision probability model.
    #[serde(default)]
    pub integration: IntegrationConfig,
}

impl LshConfigFile {
    /// Wrap existing configs in a current-version file.
    pub fn new(hasher: HasherConfig) -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            hasher,
            integration: IntegrationConfig::default(),
        }
    }

    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: LshConfigFile = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate the version and every section.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }
        self.hasher
            .validate()
            .map_err(|source| ConfigLoadError::Invalid {
                section: "hasher",
                source,
            })?;
        self.integration
            .validate()
            .map_err(|source| ConfigLoadError::Invalid {
                section: "integration",
                source,
            })?;
        Ok(())
    }
}

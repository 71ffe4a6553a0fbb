//! YAML deployment configuration for simdex.
//!
//! A deployment config pins the storage backend and the index
//! parameters every invocation of that deployment shares, plus the
//! optional feature-alias table.
//!
//! ## Example YAML configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "grouping-similarity"
//!
//! backend: "in_memory"
//!
//! index:
//!   scope: "sim"
//!   bands: 8
//!   window: 3600
//!   retention: 720
//!
//! aliases:
//!   "message:character-shingles": "a"
//!   "stacktrace:frame-pairs": "b"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use index::{BackendConfig, IndexParams};

use crate::aliases::{AliasError, FeatureAliases};

/// Errors that can occur when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid alias table: {0}")]
    Aliases(#[from] AliasError),
}

/// Top-level deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimdexConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional configuration name/description.
    #[serde(default)]
    pub name: Option<String>,

    /// Storage backend selector.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Index parameters shared by every invocation of this deployment.
    #[serde(default)]
    pub index: IndexYamlConfig,

    /// Feature label → compact index key table.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl SimdexConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: SimdexConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        let valid_backends = ["in_memory"];
        if !valid_backends.contains(&self.backend.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "backend must be one of: {valid_backends:?}"
            )));
        }

        self.index.validate()
    }

    /// The backend configuration described by this deployment.
    /// `validate` has already pinned the selector to a known backend.
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::InMemory
    }

    /// The index parameters described by this deployment.
    pub fn index_params(&self) -> IndexParams {
        IndexParams {
            scope: self.index.scope.clone(),
            bands: self.index.bands,
            window: self.index.window,
            retention: self.index.retention,
        }
    }

    /// Build the feature-alias registry from the alias table.
    pub fn feature_aliases(&self) -> Result<FeatureAliases, AliasError> {
        FeatureAliases::new(self.aliases.clone())
    }
}

impl Default for SimdexConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            backend: default_backend(),
            index: IndexYamlConfig::default(),
            aliases: HashMap::new(),
        }
    }
}

/// Index parameter block of the YAML config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexYamlConfig {
    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default = "default_bands")]
    pub bands: u8,

    #[serde(default = "default_window")]
    pub window: i64,

    #[serde(default = "default_retention")]
    pub retention: i64,
}

impl IndexYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.scope.is_empty() {
            return Err(ConfigLoadError::Validation(
                "index.scope must not be empty".to_string(),
            ));
        }
        if self.bands == 0 {
            return Err(ConfigLoadError::Validation(
                "index.bands must be >= 1".to_string(),
            ));
        }
        if self.window <= 0 {
            return Err(ConfigLoadError::Validation(
                "index.window must be > 0".to_string(),
            ));
        }
        if self.retention < 0 {
            return Err(ConfigLoadError::Validation(
                "index.retention must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for IndexYamlConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            bands: default_bands(),
            window: default_window(),
            retention: default_retention(),
        }
    }
}

// Helper functions for serde defaults
fn default_backend() -> String {
    "in_memory".to_string()
}
fn default_scope() -> String {
    "sim".to_string()
}
fn default_bands() -> u8 {
    8
}
fn default_window() -> i64 {
    3600
}
fn default_retention() -> i64 {
    720
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_valid_yaml() {
        let yaml = r#"
version: "1.0"
name: "test config"
backend: "in_memory"
index:
  scope: "s"
  bands: 2
  window: 60
  retention: 1
aliases:
  "message:character-shingles": "a"
"#;

        let config = SimdexConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.name, Some("test config".to_string()));
        assert_eq!(config.index.scope, "s");
        assert_eq!(config.index.bands, 2);

        let params = config.index_params();
        assert_eq!(params.window, 60);
        assert_eq!(params.retention, 1);

        let aliases = config.feature_aliases().unwrap();
        assert_eq!(aliases.index_key("message:character-shingles"), Some("a"));
    }

    #[test]
    fn load_from_file() {
        let yaml = r#"
version: "1.0"
index:
  scope: "s"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let config = SimdexConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.index.bands, default_bands());
    }

    #[test]
    fn default_config_is_valid() {
        let config = SimdexConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn unsupported_version_rejected() {
        let result = SimdexConfig::from_yaml("version: \"2.0\"\n");
        assert!(matches!(result, Err(ConfigLoadError::UnsupportedVersion(_))));
    }

    #[test]
    fn invalid_index_parameters_rejected() {
        for (yaml, needle) in [
            ("version: \"1.0\"\nindex:\n  bands: 0\n", "bands"),
            ("version: \"1.0\"\nindex:\n  window: 0\n", "window"),
            ("version: \"1.0\"\nindex:\n  retention: -1\n", "retention"),
        ] {
            let err = SimdexConfig::from_yaml(yaml).unwrap_err();
            assert!(err.to_string().contains(needle), "expected {needle} in {err}");
        }
    }

    #[test]
    fn unknown_backend_rejected() {
        let result = SimdexConfig::from_yaml("version: \"1.0\"\nbackend: \"redis\"\n");
        assert!(matches!(result, Err(ConfigLoadError::Validation(_))));
    }
}

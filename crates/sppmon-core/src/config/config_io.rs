//! Configuration loading and validation.
//!
//! Focuses on I/O and filesystem-related helpers for config management.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::InstallerConfig;

/// File name looked up in the install root when no explicit config is given.
pub const DEFAULT_CONFIG_NAME: &str = "installer.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },
    #[error("failed to parse config: {0}")]
    ParseFailed(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl InstallerConfig {
    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(path = %path.display(), "installer config loaded");
        Ok(config)
    }

    /// Load `installer.toml` from the install root, if present.
    pub fn load_for_root(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::default_config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: InstallerConfig =
            toml::from_str(contents).map_err(|err| ConfigError::ParseFailed(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config_path(root: &Path) -> PathBuf {
        root.join(DEFAULT_CONFIG_NAME)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.packages.manager.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "packages.manager must not be empty".to_string(),
            ));
        }
        if self.datastore.port == 0 {
            return Err(ConfigError::Invalid("datastore.port must not be 0".to_string()));
        }
        if self.dashboard.port == 0 {
            return Err(ConfigError::Invalid("dashboard.port must not be 0".to_string()));
        }
        if self.datastore.max_user_attempts == 0 {
            return Err(ConfigError::Invalid(
                "datastore.max_user_attempts must be at least 1".to_string(),
            ));
        }
        for (section, tls) in [
            ("datastore.tls", &self.datastore.tls),
            ("dashboard.tls", &self.dashboard.tls),
        ] {
            // TLS can only be toggled on when the certificate material exists in config.
            if tls.enable_by_default && !tls.has_material() {
                return Err(ConfigError::Invalid(format!(
                    "{section}.enable_by_default requires cert_file and key_file"
                )));
            }
        }
        Ok(())
    }
}

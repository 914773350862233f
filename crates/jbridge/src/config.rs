//! Bridge configuration (jbridge.toml)
//!
//! ```toml
//! [boundary]
//! library = "./libjbridge_loopback.so"
//! symbol_prefix = ""
//!
//! [log]
//! level = "info"
//! json = false
//! ```
//!
//! `JBRIDGE_LIBRARY`, `JBRIDGE_SYMBOL_PREFIX` and `JBRIDGE_LOG` override the
//! file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::logging::LogConfig;

/// Default configuration file name
pub const CONFIG_FILE: &str = "jbridge.toml";

/// Library path override
pub const ENV_LIBRARY: &str = "JBRIDGE_LIBRARY";

/// Symbol prefix override
pub const ENV_SYMBOL_PREFIX: &str = "JBRIDGE_SYMBOL_PREFIX";

/// Log filter override
pub const ENV_LOG: &str = "JBRIDGE_LOG";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// Boundary library settings
    #[serde(default)]
    pub boundary: BoundaryConfig,

    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Where to find the boundary and how its symbols are named
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BoundaryConfig {
    /// Path to the shared library implementing the C boundary
    #[serde(default)]
    pub library: String,

    /// Prefix prepended to every entry-point symbol name
    #[serde(default)]
    pub symbol_prefix: String,
}

impl BoundaryConfig {
    /// Boundary settings for a library with unprefixed symbols
    pub fn for_library(library: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            symbol_prefix: String::new(),
        }
    }
}

impl BridgeConfig {
    /// Read, apply environment overrides, and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Build from environment variables alone
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse config text without overrides or validation
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `JBRIDGE_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(library) = lookup(ENV_LIBRARY) {
            self.boundary.library = library;
        }
        if let Some(prefix) = lookup(ENV_SYMBOL_PREFIX) {
            self.boundary.symbol_prefix = prefix;
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.log.level = level;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boundary.library.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "boundary.library must be set (in {} or {})",
                CONFIG_FILE, ENV_LIBRARY
            )));
        }
        if self.boundary.symbol_prefix.contains('\0') {
            return Err(ConfigError::ValidationError(
                "boundary.symbol_prefix contains a NUL byte".to_string(),
            ));
        }
        Ok(())
    }
}

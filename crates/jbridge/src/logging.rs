//! Logging setup
//!
//! The bridge emits `tracing` events at every call stage (`debug!` per call,
//! `trace!` per stage, `warn!` on protocol oddities). Nothing is printed
//! until a subscriber is installed; `init_logging` installs a `fmt`
//! subscriber once per process.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ENV_LOG;

static LOGGER_INITIALIZED: OnceCell<bool> = OnceCell::new();

/// Logging configuration (`[log]` table of `jbridge.toml`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive: a level (`info`) or a full `EnvFilter` string
    /// (`jbridge=trace,warn`)
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = std::env::var(ENV_LOG) {
            config.level = level;
        }
        config
    }

    /// Verbose config for debugging a boundary
    pub fn debug() -> Self {
        Self {
            level: "jbridge=trace,info".to_string(),
            json: false,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(ENV_LOG)
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new(default_level()))
    }
}

/// Install the global subscriber.
///
/// Only the first call in a process has an effect. Returns `false` if a
/// subscriber was already installed, by this function or by someone else.
pub fn init_logging(config: &LogConfig) -> bool {
    *LOGGER_INITIALIZED.get_or_init(|| {
        let plain = (!config.json).then(|| {
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_line_number(cfg!(debug_assertions))
        });
        let json = config.json.then(|| {
            fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_target(true)
        });

        tracing_subscriber::registry()
            .with(config.filter())
            .with(plain)
            .with(json)
            .try_init()
            .is_ok()
    })
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LogConfig = toml::from_str("json = true").unwrap();
        assert_eq!(config.level, "info");
        assert!(config.json);
    }

    #[test]
    fn test_init_is_idempotent() {
        let first = init_logging(&LogConfig::default());
        let second = init_logging(&LogConfig::debug());
        assert!(is_initialized());
        assert_eq!(first, second);
    }
}

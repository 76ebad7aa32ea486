//! Startup configuration from environment variables.
//!
//! Required values fail loudly at startup rather than surfacing later as
//! connection errors. The core consumes these as opaque parameters; what
//! they point at (database file, broker bridge, serve address) is wired
//! by the binary.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable for [`Config::db_path`].
pub const ENV_DB_PATH: &str = "DISPATCH_DB_PATH";
/// Environment variable for [`Config::broker_url`].
pub const ENV_BROKER_URL: &str = "DISPATCH_BROKER_URL";
/// Environment variable for [`Config::broker_auth_token`].
pub const ENV_BROKER_AUTH_TOKEN: &str = "DISPATCH_BROKER_AUTH_TOKEN";
/// Environment variable for [`Config::serve_addr`].
pub const ENV_SERVE_ADDR: &str = "DISPATCH_SERVE_ADDR";

/// Configuration error type.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is unset or empty
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Result type alias using ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the SQLite database file.
    pub db_path: PathBuf,
    /// Base URL of the broker bridge the relay publishes to.
    pub broker_url: String,
    /// Optional bearer token for the broker bridge.
    pub broker_auth_token: Option<String>,
    /// Address under which the transport layer serves endpoints.
    pub serve_addr: String,
}

impl Config {
    /// Parse configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from an arbitrary lookup, for tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let required = |key: &'static str| -> ConfigResult<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(ConfigError::MissingVar(key)),
            }
        };

        Ok(Self {
            db_path: PathBuf::from(required(ENV_DB_PATH)?),
            broker_url: required(ENV_BROKER_URL)?,
            broker_auth_token: lookup(ENV_BROKER_AUTH_TOKEN).filter(|v| !v.trim().is_empty()),
            serve_addr: required(ENV_SERVE_ADDR)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            (ENV_DB_PATH, "/var/lib/dispatch/dispatch.db"),
            (ENV_BROKER_URL, "http://broker:9094"),
            (ENV_SERVE_ADDR, "0.0.0.0:8080"),
        ])
    }

    #[test]
    fn test_parse_full_config() {
        let vars = full_env();
        let config = Config::from_lookup(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/dispatch/dispatch.db"));
        assert_eq!(config.broker_url, "http://broker:9094");
        assert_eq!(config.serve_addr, "0.0.0.0:8080");
        assert!(config.broker_auth_token.is_none());
    }

    #[test]
    fn test_missing_required_var() {
        let mut vars = full_env();
        vars.remove(ENV_BROKER_URL);

        let err = Config::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ENV_BROKER_URL)));
    }

    #[test]
    fn test_empty_required_var_is_missing() {
        let mut vars = full_env();
        vars.insert(ENV_DB_PATH.to_string(), "  ".to_string());

        let err = Config::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ENV_DB_PATH)));
    }

    #[test]
    fn test_optional_broker_token() {
        let mut vars = full_env();
        vars.insert(ENV_BROKER_AUTH_TOKEN.to_string(), "token-123".to_string());

        let config = Config::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.broker_auth_token.as_deref(), Some("token-123"));
    }
}

//! Functions app configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `FUNCTIONS_DATABASE_URL` - `PostgreSQL` connection string for the storage
//!   backend (falls back to `STORAGE_DATABASE_URL`, then `DATABASE_URL`)
//! - `FUNCTIONS_HOST` - Bind address (default: 127.0.0.1)
//! - `FUNCTIONS_PORT` - Listen port (default: 7071)
//! - `FUNCTIONS_API_KEY` - Function key; when set every `/api` request must
//!   carry it as `x-functions-key` or `?code=`
//! - `LOG_FORMAT` - `json` for JSON logs (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `STORAGE_*` - see `cloud_retail_storage::config`

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use cloud_retail_storage::{StorageBackendKind, StorageConfig, StorageConfigError};

const MIN_API_KEY_LENGTH: usize = 16;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("Storage configuration: {0}")]
    Storage(#[from] StorageConfigError),
}

/// Functions app configuration.
#[derive(Debug, Clone)]
pub struct FunctionsConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Function key required on `/api` routes
    pub api_key: Option<SecretString>,
    /// Table/blob/queue/share settings
    pub storage: StorageConfig,
    /// Emit JSON log lines
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl FunctionsConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is invalid, the `PostgreSQL` backend
    /// has no database URL, or the function key is too short.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("FUNCTIONS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("FUNCTIONS_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("FUNCTIONS_PORT", "7071")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("FUNCTIONS_PORT".to_string(), e.to_string()))?;

        let api_key = get_optional_env("FUNCTIONS_API_KEY").map(SecretString::from);
        if let Some(key) = &api_key {
            validate_api_key(key, "FUNCTIONS_API_KEY")?;
        }

        let mut storage = StorageConfig::from_env()?;
        if let Some(url) = get_optional_env("FUNCTIONS_DATABASE_URL") {
            storage.database_url = Some(SecretString::from(url));
        }
        if storage.backend == StorageBackendKind::Postgres && storage.database_url.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "FUNCTIONS_DATABASE_URL".to_string(),
            ));
        }

        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            host,
            port,
            api_key,
            storage,
            json_logs,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional, non-empty environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Reject function keys too short to resist guessing.
fn validate_api_key(key: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = key.expose_secret().len();
    if len < MIN_API_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_API_KEY_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use cloud_retail_storage::StorageSettings;

    #[test]
    fn test_validate_api_key_length() {
        assert!(validate_api_key(&SecretString::from("short"), "TEST_KEY").is_err());
        assert!(validate_api_key(&SecretString::from("k".repeat(16)), "TEST_KEY").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = FunctionsConfig {
            host: "0.0.0.0".parse().unwrap(),
            port: 7071,
            api_key: None,
            storage: StorageConfig {
                backend: StorageBackendKind::Memory,
                database_url: None,
                settings: StorageSettings::default(),
            },
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "0.0.0.0");
        assert_eq!(addr.port(), 7071);
    }
}

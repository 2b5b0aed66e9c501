//! Storage configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `STORAGE_BACKEND` - `postgres` or `memory` (default: postgres)
//! - `STORAGE_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`, then to the pool of the binary that embeds the storage)
//! - `STORAGE_TABLE_CUSTOMERS` - Customers table name (default: Customers)
//! - `STORAGE_TABLE_PRODUCTS` - Products table name (default: Products)
//! - `STORAGE_BLOB_CONTAINER` - Product image container (default: productimages)
//! - `STORAGE_QUEUE_ORDERS` - Order queue name (default: ordersqueue)
//! - `STORAGE_FILE_SHARE` - Contracts share name (default: contracts)
//! - `STORAGE_BLOB_BASE_URL` - Public prefix for image URLs (default: /images)

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum StorageConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which [`crate::Backend`] to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackendKind {
    Postgres,
    Memory,
}

impl std::str::FromStr for StorageBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected `postgres` or `memory`, got `{other}`")),
        }
    }
}

/// Names of the storage resources and the public image URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub customers_table: String,
    pub products_table: String,
    pub image_container: String,
    pub orders_queue: String,
    pub contracts_share: String,
    /// Prefix joined with a blob name to form the image URL.
    pub blob_base_url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            customers_table: "Customers".to_owned(),
            products_table: "Products".to_owned(),
            image_container: "productimages".to_owned(),
            orders_queue: "ordersqueue".to_owned(),
            contracts_share: "contracts".to_owned(),
            blob_base_url: "/images".to_owned(),
        }
    }
}

impl StorageSettings {
    /// Public URL of the image blob `name`.
    #[must_use]
    pub fn image_url(&self, name: &str) -> String {
        format!("{}/{name}", self.blob_base_url.trim_end_matches('/'))
    }
}

/// Storage backend selection plus resource names.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// Required for the `PostgreSQL` backend.
    pub database_url: Option<SecretString>,
    pub settings: StorageSettings,
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `StorageConfigError` if `STORAGE_BACKEND` is unrecognized.
    ///
    /// A missing database URL is not an error here: binaries that already own
    /// a pool pass it to [`crate::connect_with_pool`].
    pub fn from_env() -> Result<Self, StorageConfigError> {
        let _ = dotenvy::dotenv();

        let backend = get_env_or_default("STORAGE_BACKEND", "postgres")
            .parse::<StorageBackendKind>()
            .map_err(|e| StorageConfigError::InvalidEnvVar("STORAGE_BACKEND".to_owned(), e))?;

        let database_url = get_optional_env("STORAGE_DATABASE_URL")
            .or_else(|| get_optional_env("DATABASE_URL"))
            .map(SecretString::from);

        let defaults = StorageSettings::default();
        let settings = StorageSettings {
            customers_table: get_env_or_default("STORAGE_TABLE_CUSTOMERS", &defaults.customers_table),
            products_table: get_env_or_default("STORAGE_TABLE_PRODUCTS", &defaults.products_table),
            image_container: get_env_or_default("STORAGE_BLOB_CONTAINER", &defaults.image_container),
            orders_queue: get_env_or_default("STORAGE_QUEUE_ORDERS", &defaults.orders_queue),
            contracts_share: get_env_or_default("STORAGE_FILE_SHARE", &defaults.contracts_share),
            blob_base_url: get_env_or_default("STORAGE_BLOB_BASE_URL", &defaults.blob_base_url),
        };

        Ok(Self {
            backend,
            database_url,
            settings,
        })
    }
}

/// Get an optional, non-empty environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(
            "Postgres".parse::<StorageBackendKind>().unwrap(),
            StorageBackendKind::Postgres
        );
        assert_eq!(
            "memory".parse::<StorageBackendKind>().unwrap(),
            StorageBackendKind::Memory
        );
        assert!("azure".parse::<StorageBackendKind>().is_err());
    }

    #[test]
    fn test_default_names() {
        let settings = StorageSettings::default();
        assert_eq!(settings.customers_table, "Customers");
        assert_eq!(settings.products_table, "Products");
        assert_eq!(settings.image_container, "productimages");
        assert_eq!(settings.orders_queue, "ordersqueue");
        assert_eq!(settings.contracts_share, "contracts");
    }

    #[test]
    fn test_image_url_joins_without_double_slash() {
        let mut settings = StorageSettings::default();
        assert_eq!(settings.image_url("r_a.png"), "/images/r_a.png");

        settings.blob_base_url = "https://cdn.example.com/productimages/".to_owned();
        assert_eq!(
            settings.image_url("r_a.png"),
            "https://cdn.example.com/productimages/r_a.png"
        );
    }
}

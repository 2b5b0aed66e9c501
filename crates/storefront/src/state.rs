//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use cloud_retail_core::StorageService;

use crate::config::StorefrontConfig;
use crate::services::{FunctionApiClient, FunctionApiError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the relational pool, the storage service and the functions app client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    storage: Arc<dyn StorageService>,
    functions: FunctionApiClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool (users, carts, orders)
    /// * `storage` - Table/blob/queue/share service
    ///
    /// # Errors
    ///
    /// Returns an error if the functions app HTTP client cannot be built.
    pub fn new(
        config: StorefrontConfig,
        pool: PgPool,
        storage: Arc<dyn StorageService>,
    ) -> Result<Self, FunctionApiError> {
        let functions = FunctionApiClient::new(
            config.function_app.base_url.clone(),
            config.function_app.key.clone(),
        )?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                storage,
                functions,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the storage service.
    #[must_use]
    pub fn storage(&self) -> &dyn StorageService {
        self.inner.storage.as_ref()
    }

    /// Get a reference to the functions app client.
    #[must_use]
    pub fn functions(&self) -> &FunctionApiClient {
        &self.inner.functions
    }
}

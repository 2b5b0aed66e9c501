//! Cloud Retail storage - implementations of [`StorageService`].
//!
//! # Layout
//!
//! - [`backend`] - the low-level [`Backend`] primitives (entities, blobs,
//!   queue messages, share files)
//! - [`memory`] - in-process backend for tests and local runs
//! - [`postgres`] - `PostgreSQL` backend (schema `storage`)
//! - [`service`] - [`Storage`], which implements [`StorageService`] on top of
//!   any backend: key defaults, ordering, image naming, queue encoding
//! - [`codec`] - base64 JSON encoding for queue messages
//! - [`config`] - container/table/queue/share names from the environment
//!
//! # Migrations
//!
//! The `PostgreSQL` schema lives in `crates/storage/migrations/` and is run via:
//! ```bash
//! cargo run -p cloud-retail-cli -- migrate storage
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod codec;
pub mod config;
pub mod memory;
pub mod postgres;
pub mod service;

use std::sync::Arc;

use sqlx::PgPool;

pub use backend::{Backend, Blob, TableEntity};
pub use cloud_retail_core::{StorageError, StorageService};
pub use config::{StorageBackendKind, StorageConfig, StorageConfigError, StorageSettings};
pub use memory::MemoryBackend;
pub use postgres::PgBackend;
pub use service::Storage;

/// Build the configured storage service.
///
/// # Errors
///
/// Returns `StorageError::Backend` if the `PostgreSQL` backend cannot connect.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn StorageService>, StorageError> {
    match config.backend {
        StorageBackendKind::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(Storage::new(
                MemoryBackend::new(),
                config.settings.clone(),
            )))
        }
        StorageBackendKind::Postgres => {
            let url = config.database_url.as_ref().ok_or_else(|| {
                StorageError::Backend("STORAGE_DATABASE_URL is not set".to_owned())
            })?;
            let backend = PgBackend::connect(url).await?;
            tracing::info!("Storage backend connected");
            Ok(Arc::new(Storage::new(backend, config.settings.clone())))
        }
    }
}

/// Build the configured storage service, sharing `pool` when the `PostgreSQL`
/// backend has no database URL of its own.
///
/// # Errors
///
/// Returns `StorageError::Backend` if a dedicated `PostgreSQL` pool cannot connect.
pub async fn connect_with_pool(
    config: &StorageConfig,
    pool: &PgPool,
) -> Result<Arc<dyn StorageService>, StorageError> {
    if config.backend == StorageBackendKind::Postgres && config.database_url.is_none() {
        tracing::info!("Storage backend sharing the application database pool");
        return Ok(Arc::new(Storage::new(
            PgBackend::new(pool.clone()),
            config.settings.clone(),
        )));
    }
    connect(config).await
}

//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Users, carts, orders and the session table
//! retail-cli migrate storefront
//!
//! # Products, customers, image blobs, the order queue and contracts
//! retail-cli migrate storage
//!
//! # Both
//! retail-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `RETAIL_DATABASE_URL` - storefront database (falls back to `DATABASE_URL`)
//! - `STORAGE_DATABASE_URL` - storage database (falls back to
//!   `RETAIL_DATABASE_URL`, then `DATABASE_URL`)
//!
//! Both migration sets may share one database. Each set ignores the other's
//! applied versions.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use thiserror::Error;

use super::database_url;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// No connection string was configured.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the connection fails or a
/// migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    let url = database_url(&["RETAIL_DATABASE_URL", "DATABASE_URL"])
        .ok_or(MigrationError::MissingEnvVar("RETAIL_DATABASE_URL"))?;
    run("storefront", sqlx::migrate!("../storefront/migrations"), url.expose_secret()).await
}

/// Run storage database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the connection fails or a
/// migration fails.
pub async fn storage() -> Result<(), MigrationError> {
    let url = database_url(&[
        "STORAGE_DATABASE_URL",
        "RETAIL_DATABASE_URL",
        "DATABASE_URL",
    ])
    .ok_or(MigrationError::MissingEnvVar("STORAGE_DATABASE_URL"))?;
    run("storage", sqlx::migrate!("../storage/migrations"), url.expose_secret()).await
}

async fn run(name: &str, mut migrator: Migrator, url: &str) -> Result<(), MigrationError> {
    tracing::info!("Connecting to {name} database...");
    let pool = PgPool::connect(url).await?;

    migrator.set_ignore_missing(true);

    tracing::info!(count = migrator.iter().count(), "Running {name} migrations...");
    migrator.run(&pool).await?;

    tracing::info!("{name} migrations complete!");
    pool.close().await;
    Ok(())
}

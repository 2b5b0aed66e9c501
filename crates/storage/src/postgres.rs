//! `PostgreSQL` storage backend.
//!
//! # Tables (schema `storage`)
//!
//! - `table_entity` - JSONB entities keyed by `(table_name, partition_key, row_key)`
//! - `blob` - image bodies keyed by `(container, name)`
//! - `queue_message` - FIFO messages ordered by serial id
//! - `share_file` - contract bodies keyed by `(share_name, name)`

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use cloud_retail_core::StorageError;

use crate::backend::{Backend, Blob, TableEntity};

fn backend_err(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

#[derive(sqlx::FromRow)]
struct EntityRow {
    partition_key: String,
    row_key: String,
    properties: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<EntityRow> for TableEntity {
    fn from(row: EntityRow) -> Self {
        Self {
            partition_key: row.partition_key,
            row_key: row.row_key,
            properties: row.properties,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BlobRow {
    content_type: String,
    body: Vec<u8>,
}

/// [`Backend`] over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool with the same sizing as the web database pool.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Backend` if the connection cannot be established.
    pub async fn connect(database_url: &SecretString) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url.expose_secret())
            .await
            .map_err(backend_err)?;
        Ok(Self { pool })
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn insert_entity(&self, table: &str, entity: TableEntity) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO storage.table_entity (table_name, partition_key, row_key, properties, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(table)
        .bind(&entity.partition_key)
        .bind(&entity.row_key)
        .bind(&entity.properties)
        .bind(entity.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StorageError::Conflict(format!(
                    "{table}({}, {}) already exists",
                    entity.partition_key, entity.row_key
                ));
            }
            backend_err(e)
        })?;
        Ok(())
    }

    async fn upsert_entity(&self, table: &str, entity: TableEntity) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO storage.table_entity (table_name, partition_key, row_key, properties, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (table_name, partition_key, row_key)
            DO UPDATE SET properties = EXCLUDED.properties,
                          created_at = EXCLUDED.created_at,
                          updated_at = now()
            ",
        )
        .bind(table)
        .bind(&entity.partition_key)
        .bind(&entity.row_key)
        .bind(&entity.properties)
        .bind(entity.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn get_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<TableEntity>, StorageError> {
        let row: Option<EntityRow> = sqlx::query_as(
            r"
            SELECT partition_key, row_key, properties, created_at
            FROM storage.table_entity
            WHERE table_name = $1 AND partition_key = $2 AND row_key = $3
            ",
        )
        .bind(table)
        .bind(partition_key)
        .bind(row_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(row.map(TableEntity::from))
    }

    async fn list_entities(&self, table: &str) -> Result<Vec<TableEntity>, StorageError> {
        let rows: Vec<EntityRow> = sqlx::query_as(
            r"
            SELECT partition_key, row_key, properties, created_at
            FROM storage.table_entity
            WHERE table_name = $1
            ",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(rows.into_iter().map(TableEntity::from).collect())
    }

    async fn delete_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r"
            DELETE FROM storage.table_entity
            WHERE table_name = $1 AND partition_key = $2 AND row_key = $3
            ",
        )
        .bind(table)
        .bind(partition_key)
        .bind(row_key)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn put_blob(&self, container: &str, name: &str, blob: Blob) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO storage.blob (container, name, content_type, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (container, name)
            DO UPDATE SET content_type = EXCLUDED.content_type,
                          body = EXCLUDED.body,
                          updated_at = now()
            ",
        )
        .bind(container)
        .bind(name)
        .bind(&blob.content_type)
        .bind(&blob.bytes)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn get_blob(&self, container: &str, name: &str) -> Result<Option<Blob>, StorageError> {
        let row: Option<BlobRow> = sqlx::query_as(
            r"
            SELECT content_type, body
            FROM storage.blob
            WHERE container = $1 AND name = $2
            ",
        )
        .bind(container)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(row.map(|r| Blob {
            content_type: r.content_type,
            bytes: r.body,
        }))
    }

    async fn delete_blob(&self, container: &str, name: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM storage.blob WHERE container = $1 AND name = $2")
            .bind(container)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn push_message(&self, queue: &str, text: String) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO storage.queue_message (queue_name, message_text) VALUES ($1, $2)")
            .bind(queue)
            .bind(text)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn peek_messages(&self, queue: &str, max: usize) -> Result<Vec<String>, StorageError> {
        let limit = i64::try_from(max).unwrap_or(i64::MAX);
        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT message_text
            FROM storage.queue_message
            WHERE queue_name = $1
            ORDER BY id ASC
            LIMIT $2
            ",
        )
        .bind(queue)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(rows.into_iter().map(|(text,)| text).collect())
    }

    async fn pop_message(&self, queue: &str) -> Result<Option<String>, StorageError> {
        // SKIP LOCKED lets concurrent consumers each take a different message
        let row: Option<(String,)> = sqlx::query_as(
            r"
            DELETE FROM storage.queue_message
            WHERE id = (
                SELECT id FROM storage.queue_message
                WHERE queue_name = $1
                ORDER BY id ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING message_text
            ",
        )
        .bind(queue)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(row.map(|(text,)| text))
    }

    async fn put_file(&self, share: &str, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO storage.share_file (share_name, name, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (share_name, name)
            DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            ",
        )
        .bind(share)
        .bind(name)
        .bind(bytes)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn list_files(&self, share: &str) -> Result<Vec<(String, u64)>, StorageError> {
        let rows: Vec<(String, i32)> = sqlx::query_as(
            r"
            SELECT name, octet_length(body)
            FROM storage.share_file
            WHERE share_name = $1
            ORDER BY name ASC
            ",
        )
        .bind(share)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(rows
            .into_iter()
            .map(|(name, size)| (name, u64::try_from(size).unwrap_or(0)))
            .collect())
    }

    async fn get_file(&self, share: &str, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT body FROM storage.share_file WHERE share_name = $1 AND name = $2")
                .bind(share)
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend_err)?;
        Ok(row.map(|(body,)| body))
    }

    async fn delete_file(&self, share: &str, name: &str) -> Result<bool, StorageError> {
        let result =
            sqlx::query("DELETE FROM storage.share_file WHERE share_name = $1 AND name = $2")
                .bind(share)
                .bind(name)
                .execute(&self.pool)
                .await
                .map_err(backend_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}

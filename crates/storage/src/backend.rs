//! Low-level storage primitives.
//!
//! A [`Backend`] knows nothing about customers or orders: it stores opaque
//! JSON entities by `(table, partition, row)`, named blobs per container,
//! text messages per queue, and byte files per share. Domain rules live in
//! [`crate::service::Storage`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cloud_retail_core::StorageError;

/// A table entity: keys plus the JSON-encoded model.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEntity {
    pub partition_key: String,
    pub row_key: String,
    pub properties: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A blob body with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Primitive operations over tables, blobs, queues and file shares.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Insert a new entity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the keys already exist.
    async fn insert_entity(&self, table: &str, entity: TableEntity) -> Result<(), StorageError>;

    /// Insert or fully replace an entity.
    async fn upsert_entity(&self, table: &str, entity: TableEntity) -> Result<(), StorageError>;

    async fn get_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<TableEntity>, StorageError>;

    /// Every entity in the table, in no particular order.
    async fn list_entities(&self, table: &str) -> Result<Vec<TableEntity>, StorageError>;

    async fn delete_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<bool, StorageError>;

    /// Write a blob, overwriting any existing blob of the same name.
    async fn put_blob(&self, container: &str, name: &str, blob: Blob) -> Result<(), StorageError>;

    async fn get_blob(&self, container: &str, name: &str) -> Result<Option<Blob>, StorageError>;

    async fn delete_blob(&self, container: &str, name: &str) -> Result<bool, StorageError>;

    /// Append a message to the end of the queue.
    async fn push_message(&self, queue: &str, text: String) -> Result<(), StorageError>;

    /// Up to `max` messages from the front of the queue, oldest first, without
    /// removing them.
    async fn peek_messages(&self, queue: &str, max: usize) -> Result<Vec<String>, StorageError>;

    /// Remove and return the oldest message.
    async fn pop_message(&self, queue: &str) -> Result<Option<String>, StorageError>;

    /// Write a file, overwriting any existing file of the same name.
    async fn put_file(&self, share: &str, name: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// `(name, size)` of every file in the share.
    async fn list_files(&self, share: &str) -> Result<Vec<(String, u64)>, StorageError>;

    async fn get_file(&self, share: &str, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn delete_file(&self, share: &str, name: &str) -> Result<bool, StorageError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StorageError>;
}

//! In-process storage backend.
//!
//! Everything lives in `RwLock`-guarded maps and is lost when the process
//! exits. Used by tests and by `STORAGE_BACKEND=memory` for local runs.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use cloud_retail_core::StorageError;

use crate::backend::{Backend, Blob, TableEntity};

type EntityKey = (String, String);

/// In-memory [`Backend`].
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, BTreeMap<EntityKey, TableEntity>>>,
    blobs: RwLock<HashMap<String, HashMap<String, Blob>>>,
    queues: RwLock<HashMap<String, VecDeque<String>>>,
    shares: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn entity_key(partition_key: &str, row_key: &str) -> EntityKey {
    (partition_key.to_owned(), row_key.to_owned())
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn insert_entity(&self, table: &str, entity: TableEntity) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_owned()).or_default();
        let key = entity_key(&entity.partition_key, &entity.row_key);
        if rows.contains_key(&key) {
            return Err(StorageError::Conflict(format!(
                "{table}({}, {}) already exists",
                key.0, key.1
            )));
        }
        rows.insert(key, entity);
        Ok(())
    }

    async fn upsert_entity(&self, table: &str, entity: TableEntity) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let key = entity_key(&entity.partition_key, &entity.row_key);
        tables
            .entry(table.to_owned())
            .or_default()
            .insert(key, entity);
        Ok(())
    }

    async fn get_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<TableEntity>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.get(&entity_key(partition_key, row_key)))
            .cloned())
    }

    async fn list_entities(&self, table: &str) -> Result<Vec<TableEntity>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(table)
            .and_then(|rows| rows.remove(&entity_key(partition_key, row_key)))
            .is_some())
    }

    async fn put_blob(&self, container: &str, name: &str, blob: Blob) -> Result<(), StorageError> {
        self.blobs
            .write()
            .await
            .entry(container.to_owned())
            .or_default()
            .insert(name.to_owned(), blob);
        Ok(())
    }

    async fn get_blob(&self, container: &str, name: &str) -> Result<Option<Blob>, StorageError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(container).and_then(|c| c.get(name)).cloned())
    }

    async fn delete_blob(&self, container: &str, name: &str) -> Result<bool, StorageError> {
        let mut blobs = self.blobs.write().await;
        Ok(blobs
            .get_mut(container)
            .and_then(|c| c.remove(name))
            .is_some())
    }

    async fn push_message(&self, queue: &str, text: String) -> Result<(), StorageError> {
        self.queues
            .write()
            .await
            .entry(queue.to_owned())
            .or_default()
            .push_back(text);
        Ok(())
    }

    async fn peek_messages(&self, queue: &str, max: usize) -> Result<Vec<String>, StorageError> {
        let queues = self.queues.read().await;
        Ok(queues
            .get(queue)
            .map(|q| q.iter().take(max).cloned().collect())
            .unwrap_or_default())
    }

    async fn pop_message(&self, queue: &str) -> Result<Option<String>, StorageError> {
        let mut queues = self.queues.write().await;
        Ok(queues.get_mut(queue).and_then(VecDeque::pop_front))
    }

    async fn put_file(&self, share: &str, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.shares
            .write()
            .await
            .entry(share.to_owned())
            .or_default()
            .insert(name.to_owned(), bytes);
        Ok(())
    }

    async fn list_files(&self, share: &str) -> Result<Vec<(String, u64)>, StorageError> {
        let shares = self.shares.read().await;
        Ok(shares
            .get(share)
            .map(|files| {
                files
                    .iter()
                    .map(|(name, bytes)| (name.clone(), bytes.len() as u64))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_file(&self, share: &str, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let shares = self.shares.read().await;
        Ok(shares.get(share).and_then(|files| files.get(name)).cloned())
    }

    async fn delete_file(&self, share: &str, name: &str) -> Result<bool, StorageError> {
        let mut shares = self.shares.write().await;
        Ok(shares
            .get_mut(share)
            .and_then(|files| files.remove(name))
            .is_some())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn entity(pk: &str, rk: &str) -> TableEntity {
        TableEntity {
            partition_key: pk.to_owned(),
            row_key: rk.to_owned(),
            properties: serde_json::json!({ "RowKey": rk }),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_conflicts_on_duplicate_keys() {
        let backend = MemoryBackend::new();
        backend.insert_entity("T", entity("p", "1")).await.unwrap();
        let err = backend.insert_entity("T", entity("p", "1")).await;
        assert!(matches!(err, Err(StorageError::Conflict(_))));

        // Same keys in another table are independent
        backend.insert_entity("U", entity("p", "1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let backend = MemoryBackend::new();
        backend.upsert_entity("T", entity("p", "1")).await.unwrap();
        let mut replacement = entity("p", "1");
        replacement.properties = serde_json::json!({ "Name": "new" });
        backend.upsert_entity("T", replacement).await.unwrap();

        let stored = backend.get_entity("T", "p", "1").await.unwrap().unwrap();
        assert_eq!(stored.properties["Name"], "new");
        assert_eq!(backend.list_entities("T").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_queue_is_fifo_and_peek_is_non_destructive() {
        let backend = MemoryBackend::new();
        for text in ["a", "b", "c"] {
            backend.push_message("q", text.to_owned()).await.unwrap();
        }

        assert_eq!(backend.peek_messages("q", 2).await.unwrap(), vec!["a", "b"]);
        assert_eq!(backend.peek_messages("q", 10).await.unwrap().len(), 3);
        assert_eq!(backend.pop_message("q").await.unwrap().as_deref(), Some("a"));
        assert_eq!(backend.peek_messages("q", 10).await.unwrap(), vec!["b", "c"]);
        assert_eq!(backend.pop_message("empty").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_share_files() {
        let backend = MemoryBackend::new();
        backend.put_file("s", "b.pdf", vec![1, 2]).await.unwrap();
        backend.put_file("s", "a.pdf", vec![1]).await.unwrap();

        let files = backend.list_files("s").await.unwrap();
        assert_eq!(files, vec![("a.pdf".to_owned(), 1), ("b.pdf".to_owned(), 2)]);
        assert!(backend.delete_file("s", "a.pdf").await.unwrap());
        assert!(!backend.delete_file("s", "a.pdf").await.unwrap());
        assert_eq!(backend.get_file("s", "a.pdf").await.unwrap(), None);
    }
}

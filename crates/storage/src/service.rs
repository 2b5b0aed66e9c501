//! [`StorageService`] over any [`Backend`].
//!
//! This is where the shop's storage rules live:
//! - blank partition/row keys are filled before writes
//! - listings are ordered by `CreatedAt`, newest first
//! - product images are stored as `{RowKey}_{fileName}` and their URL recorded
//! - queue messages are base64 JSON; undecodable messages are skipped on peek
//! - contract names must be plain file names

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use cloud_retail_core::storage::MAX_PEEK_MESSAGES;
use cloud_retail_core::{
    ContractFile, CustomerModel, ImageUpload, OrderMessage, ProductModel, StorageError,
    StorageService, StoredBlob,
};

use crate::backend::{Backend, Blob, TableEntity};
use crate::codec;
use crate::config::StorageSettings;

/// Storage service parameterized by its backend.
pub struct Storage<B> {
    backend: B,
    settings: StorageSettings,
}

impl<B: Backend> Storage<B> {
    /// Create a storage service.
    #[must_use]
    pub const fn new(backend: B, settings: StorageSettings) -> Self {
        Self { backend, settings }
    }

    /// Resource names in use.
    #[must_use]
    pub const fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    async fn upload_image(
        &self,
        row_key: &str,
        upload: ImageUpload,
    ) -> Result<String, StorageError> {
        if upload.file_name.is_empty() {
            return Err(StorageError::InvalidInput(
                "image file name is empty".to_owned(),
            ));
        }
        let name = upload.blob_name(row_key);
        self.backend
            .put_blob(
                &self.settings.image_container,
                &name,
                Blob {
                    content_type: upload.content_type,
                    bytes: upload.bytes,
                },
            )
            .await?;
        tracing::debug!(blob = %name, "Uploaded product image");
        Ok(self.settings.image_url(&name))
    }

    /// Delete the image referenced by `product`, logging rather than failing.
    async fn remove_product_image(&self, product: &ProductModel) {
        let Some(name) = product.image_blob_name() else {
            return;
        };
        if let Err(e) = self
            .backend
            .delete_blob(&self.settings.image_container, name)
            .await
        {
            tracing::warn!(blob = %name, error = %e, "Failed to delete product image");
        }
    }
}

fn to_entity<T: Serialize>(
    partition_key: &str,
    row_key: &str,
    created_at: chrono::DateTime<chrono::Utc>,
    model: &T,
) -> Result<TableEntity, StorageError> {
    let properties = serde_json::to_value(model).map_err(|e| StorageError::Codec(e.to_string()))?;
    Ok(TableEntity {
        partition_key: partition_key.to_owned(),
        row_key: row_key.to_owned(),
        properties,
        created_at,
    })
}

fn from_entity<T: DeserializeOwned>(entity: TableEntity) -> Result<T, StorageError> {
    serde_json::from_value(entity.properties).map_err(|e| StorageError::Codec(e.to_string()))
}

fn require_keys(partition_key: &str, row_key: &str) -> Result<(), StorageError> {
    if partition_key.trim().is_empty() || row_key.trim().is_empty() {
        return Err(StorageError::InvalidInput(
            "PartitionKey and RowKey are required".to_owned(),
        ));
    }
    Ok(())
}

/// Reject names that would escape the flat share.
fn validate_file_name(name: &str) -> Result<(), StorageError> {
    if name.trim().is_empty()
        || name.contains(['/', '\\'])
        || name == "."
        || name == ".."
    {
        return Err(StorageError::InvalidInput(format!(
            "invalid file name: {name:?}"
        )));
    }
    Ok(())
}

#[async_trait]
impl<B: Backend> StorageService for Storage<B> {
    async fn add_customer(
        &self,
        mut customer: CustomerModel,
    ) -> Result<CustomerModel, StorageError> {
        customer.fill_missing_keys();
        let entity = to_entity(
            &customer.partition_key,
            &customer.row_key,
            customer.created_at,
            &customer,
        )?;
        self.backend
            .insert_entity(&self.settings.customers_table, entity)
            .await?;
        Ok(customer)
    }

    async fn list_customers(&self) -> Result<Vec<CustomerModel>, StorageError> {
        let entities = self
            .backend
            .list_entities(&self.settings.customers_table)
            .await?;
        let mut customers = entities
            .into_iter()
            .map(from_entity::<CustomerModel>)
            .collect::<Result<Vec<_>, _>>()?;
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(customers)
    }

    async fn get_customer(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<CustomerModel>, StorageError> {
        self.backend
            .get_entity(&self.settings.customers_table, partition_key, row_key)
            .await?
            .map(from_entity)
            .transpose()
    }

    async fn update_customer(
        &self,
        mut customer: CustomerModel,
    ) -> Result<CustomerModel, StorageError> {
        customer.fill_missing_keys();
        let entity = to_entity(
            &customer.partition_key,
            &customer.row_key,
            customer.created_at,
            &customer,
        )?;
        self.backend
            .upsert_entity(&self.settings.customers_table, entity)
            .await?;
        Ok(customer)
    }

    async fn delete_customer(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<bool, StorageError> {
        require_keys(partition_key, row_key)?;
        self.backend
            .delete_entity(&self.settings.customers_table, partition_key, row_key)
            .await
    }

    async fn add_product(
        &self,
        mut product: ProductModel,
        image: Option<ImageUpload>,
    ) -> Result<ProductModel, StorageError> {
        product.fill_missing_keys();
        product.image_file_name = None;
        product.image_base64 = None;

        if let Some(upload) = image {
            product.image_blob_path = Some(self.upload_image(&product.row_key, upload).await?);
        }

        let entity = to_entity(
            &product.partition_key,
            &product.row_key,
            product.created_at,
            &product,
        )?;
        self.backend
            .insert_entity(&self.settings.products_table, entity)
            .await?;
        Ok(product)
    }

    async fn list_products(&self) -> Result<Vec<ProductModel>, StorageError> {
        let entities = self
            .backend
            .list_entities(&self.settings.products_table)
            .await?;
        let mut products = entities
            .into_iter()
            .map(from_entity::<ProductModel>)
            .collect::<Result<Vec<_>, _>>()?;
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn get_product(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<ProductModel>, StorageError> {
        self.backend
            .get_entity(&self.settings.products_table, partition_key, row_key)
            .await?
            .map(from_entity)
            .transpose()
    }

    async fn update_product(
        &self,
        mut product: ProductModel,
        image: Option<ImageUpload>,
    ) -> Result<ProductModel, StorageError> {
        product.fill_missing_keys();
        product.image_file_name = None;
        product.image_base64 = None;

        if let Some(upload) = image {
            let previous = self
                .get_product(&product.partition_key, &product.row_key)
                .await?;
            let new_url = self.upload_image(&product.row_key, upload).await?;
            if let Some(previous) = previous
                && previous.image_blob_path.as_deref() != Some(new_url.as_str())
            {
                self.remove_product_image(&previous).await;
            }
            product.image_blob_path = Some(new_url);
        }

        let entity = to_entity(
            &product.partition_key,
            &product.row_key,
            product.created_at,
            &product,
        )?;
        self.backend
            .upsert_entity(&self.settings.products_table, entity)
            .await?;
        Ok(product)
    }

    async fn delete_product(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<bool, StorageError> {
        require_keys(partition_key, row_key)?;
        let existing = self.get_product(partition_key, row_key).await?;
        let deleted = self
            .backend
            .delete_entity(&self.settings.products_table, partition_key, row_key)
            .await?;
        if let Some(product) = existing {
            self.remove_product_image(&product).await;
        }
        Ok(deleted)
    }

    async fn enqueue_order(&self, message: &OrderMessage) -> Result<(), StorageError> {
        let text = codec::encode(message)?;
        self.backend
            .push_message(&self.settings.orders_queue, text)
            .await?;
        tracing::info!(order_id = %message.order_id, "Order message enqueued");
        Ok(())
    }

    async fn peek_orders(&self) -> Result<Vec<OrderMessage>, StorageError> {
        let texts = self
            .backend
            .peek_messages(&self.settings.orders_queue, MAX_PEEK_MESSAGES)
            .await?;
        Ok(texts
            .iter()
            .filter_map(|text| match codec::decode::<OrderMessage>(text) {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable queue message");
                    None
                }
            })
            .collect())
    }

    async fn dequeue_order(&self) -> Result<Option<OrderMessage>, StorageError> {
        // Undecodable messages are consumed and dropped so they cannot wedge the queue
        while let Some(text) = self.backend.pop_message(&self.settings.orders_queue).await? {
            match codec::decode::<OrderMessage>(&text) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => tracing::warn!(error = %e, "Dropping undecodable queue message"),
            }
        }
        Ok(None)
    }

    async fn get_image(&self, name: &str) -> Result<Option<StoredBlob>, StorageError> {
        validate_file_name(name)?;
        Ok(self
            .backend
            .get_blob(&self.settings.image_container, name)
            .await?
            .map(|blob| StoredBlob {
                content_type: blob.content_type,
                bytes: blob.bytes,
            }))
    }

    async fn delete_image(&self, name: &str) -> Result<bool, StorageError> {
        validate_file_name(name)?;
        self.backend
            .delete_blob(&self.settings.image_container, name)
            .await
    }

    async fn upload_contract(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        validate_file_name(name)?;
        self.backend
            .put_file(&self.settings.contracts_share, name, bytes)
            .await?;
        tracing::info!(file = %name, "Contract uploaded");
        Ok(())
    }

    async fn list_contracts(&self) -> Result<Vec<ContractFile>, StorageError> {
        let mut files: Vec<ContractFile> = self
            .backend
            .list_files(&self.settings.contracts_share)
            .await?
            .into_iter()
            .map(|(name, size)| ContractFile { name, size })
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn download_contract(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_file_name(name)?;
        self.backend
            .get_file(&self.settings.contracts_share, name)
            .await
    }

    async fn delete_contract(&self, name: &str) -> Result<bool, StorageError> {
        validate_file_name(name)?;
        self.backend
            .delete_file(&self.settings.contracts_share, name)
            .await
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        self.backend.ping().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use cloud_retail_core::{OrderId, OrderItem, OrderStatus, UserId};

    use super::*;
    use crate::memory::MemoryBackend;

    fn storage() -> Storage<MemoryBackend> {
        Storage::new(MemoryBackend::new(), StorageSettings::default())
    }

    fn order(id: i32) -> OrderMessage {
        OrderMessage {
            order_id: OrderId::new(id),
            user_id: UserId::new(1),
            items: vec![OrderItem {
                product_id: "p".to_owned(),
                quantity: 1,
                unit_price: Decimal::new(500, 2),
            }],
            total_amount: Decimal::new(500, 2),
            order_date: Utc::now(),
            status: OrderStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_customers_listed_newest_first() {
        let storage = storage();
        let now = Utc::now();
        for (name, age) in [("old", 2), ("new", 0), ("mid", 1)] {
            storage
                .add_customer(CustomerModel {
                    first_name: name.to_owned(),
                    created_at: now - Duration::days(age),
                    ..CustomerModel::default()
                })
                .await
                .unwrap();
        }

        let names: Vec<String> = storage
            .list_customers()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.first_name)
            .collect();
        assert_eq!(names, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_add_customer_fills_keys_and_conflicts_on_duplicate() {
        let storage = storage();
        let created = storage
            .add_customer(CustomerModel {
                partition_key: String::new(),
                row_key: String::new(),
                ..CustomerModel::default()
            })
            .await
            .unwrap();
        assert_eq!(created.partition_key, "Customer");
        assert!(!created.row_key.is_empty());

        let again = storage.add_customer(created.clone()).await;
        assert!(matches!(again, Err(StorageError::Conflict(_))));

        let fetched = storage
            .get_customer("Customer", &created.row_key)
            .await
            .unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn test_update_customer_replaces_fields() {
        let storage = storage();
        let mut customer = storage
            .add_customer(CustomerModel {
                phone: "555-0100".to_owned(),
                ..CustomerModel::default()
            })
            .await
            .unwrap();
        customer.phone = "555-0199".to_owned();
        storage.update_customer(customer.clone()).await.unwrap();

        let stored = storage
            .get_customer(&customer.partition_key, &customer.row_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.phone, "555-0199");
    }

    #[tokio::test]
    async fn test_delete_customer_reports_existence() {
        let storage = storage();
        let customer = storage.add_customer(CustomerModel::default()).await.unwrap();
        assert!(
            storage
                .delete_customer(&customer.partition_key, &customer.row_key)
                .await
                .unwrap()
        );
        assert!(
            !storage
                .delete_customer(&customer.partition_key, &customer.row_key)
                .await
                .unwrap()
        );
        assert!(matches!(
            storage.delete_customer("", "x").await,
            Err(StorageError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_add_product_with_image_records_url() {
        let storage = storage();
        let product = storage
            .add_product(
                ProductModel {
                    row_key: "prod1".to_owned(),
                    name: "Mug".to_owned(),
                    price: Decimal::new(1250, 2),
                    ..ProductModel::default()
                },
                Some(ImageUpload::new("mug.png", "image/png", vec![1, 2, 3])),
            )
            .await
            .unwrap();

        assert_eq!(
            product.image_blob_path.as_deref(),
            Some("/images/prod1_mug.png")
        );
        let blob = storage.get_image("prod1_mug.png").await.unwrap().unwrap();
        assert_eq!(blob.content_type, "image/png");
        assert_eq!(blob.bytes, vec![1, 2, 3]);

        let stored = storage.get_product("Product", "prod1").await.unwrap().unwrap();
        assert_eq!(stored.image_blob_path, product.image_blob_path);
        assert_eq!(stored.price, Decimal::new(1250, 2));
    }

    #[tokio::test]
    async fn test_add_product_never_persists_inline_image_fields() {
        let storage = storage();
        let product = storage
            .add_product(
                ProductModel {
                    image_file_name: Some("x.png".to_owned()),
                    image_base64: Some("AAAA".to_owned()),
                    ..ProductModel::default()
                },
                None,
            )
            .await
            .unwrap();
        let stored = storage
            .get_product(&product.partition_key, &product.row_key)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.image_file_name.is_none());
        assert!(stored.image_base64.is_none());
    }

    #[tokio::test]
    async fn test_update_product_with_new_image_deletes_old_blob() {
        let storage = storage();
        let product = storage
            .add_product(
                ProductModel {
                    row_key: "p1".to_owned(),
                    ..ProductModel::default()
                },
                Some(ImageUpload::new("old.png", "image/png", vec![1])),
            )
            .await
            .unwrap();

        let updated = storage
            .update_product(
                product,
                Some(ImageUpload::new("new.png", "image/png", vec![2])),
            )
            .await
            .unwrap();

        assert_eq!(updated.image_blob_path.as_deref(), Some("/images/p1_new.png"));
        assert!(storage.get_image("p1_old.png").await.unwrap().is_none());
        assert!(storage.get_image("p1_new.png").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_product_without_image_keeps_existing_url() {
        let storage = storage();
        let mut product = storage
            .add_product(
                ProductModel {
                    row_key: "p2".to_owned(),
                    ..ProductModel::default()
                },
                Some(ImageUpload::new("a.png", "image/png", vec![1])),
            )
            .await
            .unwrap();
        product.name = "Renamed".to_owned();

        let updated = storage.update_product(product, None).await.unwrap();
        assert_eq!(updated.image_blob_path.as_deref(), Some("/images/p2_a.png"));
        assert!(storage.get_image("p2_a.png").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_product_removes_image() {
        let storage = storage();
        storage
            .add_product(
                ProductModel {
                    row_key: "p3".to_owned(),
                    ..ProductModel::default()
                },
                Some(ImageUpload::new("a.png", "image/png", vec![1])),
            )
            .await
            .unwrap();

        assert!(storage.delete_product("Product", "p3").await.unwrap());
        assert!(storage.get_image("p3_a.png").await.unwrap().is_none());
        assert!(storage.get_product("Product", "p3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_peek_is_non_destructive_and_capped() {
        let storage = storage();
        for id in 1..=40 {
            storage.enqueue_order(&order(id)).await.unwrap();
        }

        let peeked = storage.peek_orders().await.unwrap();
        assert_eq!(peeked.len(), MAX_PEEK_MESSAGES);
        assert_eq!(peeked.first().map(|m| m.order_id), Some(OrderId::new(1)));
        assert_eq!(storage.peek_orders().await.unwrap().len(), MAX_PEEK_MESSAGES);
    }

    #[tokio::test]
    async fn test_dequeue_removes_oldest_and_skips_garbage() {
        let storage = storage();
        storage
            .backend
            .push_message("ordersqueue", "garbage".to_owned())
            .await
            .unwrap();
        storage.enqueue_order(&order(1)).await.unwrap();
        storage.enqueue_order(&order(2)).await.unwrap();

        assert_eq!(storage.peek_orders().await.unwrap().len(), 2);

        let first = storage.dequeue_order().await.unwrap().unwrap();
        assert_eq!(first.order_id, OrderId::new(1));
        let second = storage.dequeue_order().await.unwrap().unwrap();
        assert_eq!(second.order_id, OrderId::new(2));
        assert!(storage.dequeue_order().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_contracts_roundtrip_through_share() {
        let storage = storage();
        storage
            .upload_contract("lease.pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        storage
            .upload_contract("alpha.docx", b"doc".to_vec())
            .await
            .unwrap();

        let names: Vec<String> = storage
            .list_contracts()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["alpha.docx", "lease.pdf"]);

        assert_eq!(
            storage.download_contract("lease.pdf").await.unwrap(),
            Some(b"%PDF".to_vec())
        );
        assert!(storage.delete_contract("lease.pdf").await.unwrap());
        assert!(!storage.delete_contract("lease.pdf").await.unwrap());
        assert_eq!(storage.download_contract("lease.pdf").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_contract_names_cannot_escape_share() {
        let storage = storage();
        for name in ["", "../etc/passwd", "a/b.pdf", r"a\b.pdf", ".."] {
            assert!(matches!(
                storage.upload_contract(name, vec![1]).await,
                Err(StorageError::InvalidInput(_))
            ));
        }
    }
}

//! Storage contract shared by the storefront and the functions API.
//!
//! [`StorageService`] covers the four primitives the shop runs on:
//!
//! - **Tables** - `Customers` and `Products` entities keyed by partition/row key
//! - **Blobs** - product images, named `{RowKey}_{fileName}`
//! - **Queue** - `OrderMessage`s published at checkout
//! - **File share** - contract documents in a flat share
//!
//! The trait is object-safe (`Arc<dyn StorageService>`) so handlers do not
//! care which backend is configured.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{CustomerModel, ImageUpload, OrderMessage, ProductModel};

/// Maximum number of queued orders returned by a peek.
pub const MAX_PEEK_MESSAGES: usize = 32;

/// Errors returned by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The addressed entity, blob, or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entity with the same keys already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller supplied something unusable (blank key, bad file name).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A stored payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The underlying store failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A stored blob with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A file in the contracts share.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContractFile {
    pub name: String,
    pub size: u64,
}

/// Table, blob, queue and file-share operations used by the shop.
#[async_trait]
pub trait StorageService: Send + Sync {
    // =========================================================================
    // Customers
    // =========================================================================

    /// Insert a customer. Blank keys are filled before insertion.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the keys are already taken.
    async fn add_customer(&self, customer: CustomerModel) -> Result<CustomerModel, StorageError>;

    /// All customers, newest first.
    async fn list_customers(&self) -> Result<Vec<CustomerModel>, StorageError>;

    /// Look up one customer.
    async fn get_customer(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<CustomerModel>, StorageError>;

    /// Replace (or create) a customer by its keys.
    async fn update_customer(&self, customer: CustomerModel)
    -> Result<CustomerModel, StorageError>;

    /// Delete a customer, returning whether it existed.
    async fn delete_customer(&self, partition_key: &str, row_key: &str)
    -> Result<bool, StorageError>;

    // =========================================================================
    // Products
    // =========================================================================

    /// Insert a product, uploading `image` first and recording its URL.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the keys are already taken.
    async fn add_product(
        &self,
        product: ProductModel,
        image: Option<ImageUpload>,
    ) -> Result<ProductModel, StorageError>;

    /// All products, newest first.
    async fn list_products(&self) -> Result<Vec<ProductModel>, StorageError>;

    /// Look up one product.
    async fn get_product(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<ProductModel>, StorageError>;

    /// Replace (or create) a product by its keys.
    ///
    /// When `image` is supplied the previous image blob is deleted and the
    /// new one recorded.
    async fn update_product(
        &self,
        product: ProductModel,
        image: Option<ImageUpload>,
    ) -> Result<ProductModel, StorageError>;

    /// Delete a product and its image, returning whether it existed.
    async fn delete_product(&self, partition_key: &str, row_key: &str)
    -> Result<bool, StorageError>;

    // =========================================================================
    // Orders queue
    // =========================================================================

    /// Publish an order message.
    async fn enqueue_order(&self, message: &OrderMessage) -> Result<(), StorageError>;

    /// Up to [`MAX_PEEK_MESSAGES`] queued orders without removing them.
    ///
    /// Messages that fail to decode are skipped.
    async fn peek_orders(&self) -> Result<Vec<OrderMessage>, StorageError>;

    /// Receive and delete the oldest queued order.
    async fn dequeue_order(&self) -> Result<Option<OrderMessage>, StorageError>;

    // =========================================================================
    // Image blobs
    // =========================================================================

    /// Fetch an image blob by name.
    async fn get_image(&self, name: &str) -> Result<Option<StoredBlob>, StorageError>;

    /// Delete an image blob, returning whether it existed.
    async fn delete_image(&self, name: &str) -> Result<bool, StorageError>;

    // =========================================================================
    // Contracts file share
    // =========================================================================

    /// Write a contract file, overwriting any file with the same name.
    async fn upload_contract(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Contract files sorted by name.
    async fn list_contracts(&self) -> Result<Vec<ContractFile>, StorageError>;

    /// Read a contract file.
    async fn download_contract(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete a contract file, returning whether it existed.
    async fn delete_contract(&self, name: &str) -> Result<bool, StorageError>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> Result<(), StorageError>;
}

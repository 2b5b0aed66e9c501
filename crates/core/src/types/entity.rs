//! Table-storage entities.
//!
//! Customers and products live in table storage, addressed by a
//! `(PartitionKey, RowKey)` pair. Field names serialize in `PascalCase` so the
//! JSON exchanged with the functions API matches the stored property names.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default partition for customer entities.
pub const CUSTOMER_PARTITION: &str = "Customer";

/// Default partition for product entities.
pub const PRODUCT_PARTITION: &str = "Product";

fn customer_partition() -> String {
    CUSTOMER_PARTITION.to_owned()
}

fn product_partition() -> String {
    PRODUCT_PARTITION.to_owned()
}

/// A customer record in the `Customers` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerModel {
    #[serde(default = "customer_partition")]
    pub partition_key: String,
    #[serde(default)]
    pub row_key: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Default for CustomerModel {
    fn default() -> Self {
        Self {
            partition_key: customer_partition(),
            row_key: Uuid::new_v4().to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            created_at: Utc::now(),
        }
    }
}

impl CustomerModel {
    /// Fill in a blank partition key or row key.
    ///
    /// Blank partitions become `Customer`; blank row keys get a fresh UUID.
    pub fn fill_missing_keys(&mut self) {
        if self.partition_key.trim().is_empty() {
            self.partition_key = customer_partition();
        }
        if self.row_key.trim().is_empty() {
            self.row_key = Uuid::new_v4().to_string();
        }
    }

    /// First and last name joined for display.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// A product record in the `Products` table.
///
/// `image_file_name` and `image_base64` are transient: JSON clients use them
/// to upload an image alongside the record, and they are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductModel {
    #[serde(default = "product_partition")]
    pub partition_key: String,
    #[serde(default)]
    pub row_key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_blob_path: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

impl Default for ProductModel {
    fn default() -> Self {
        Self {
            partition_key: product_partition(),
            row_key: Uuid::new_v4().to_string(),
            name: String::new(),
            description: String::new(),
            price: Decimal::ZERO,
            image_blob_path: None,
            created_at: Utc::now(),
            image_file_name: None,
            image_base64: None,
        }
    }
}

impl ProductModel {
    /// Fill in a blank partition key or row key.
    pub fn fill_missing_keys(&mut self) {
        if self.partition_key.trim().is_empty() {
            self.partition_key = product_partition();
        }
        if self.row_key.trim().is_empty() {
            self.row_key = Uuid::new_v4().to_string();
        }
    }

    /// Remove and return the inline `(file name, base64 payload)` image, if
    /// both halves are present.
    pub fn take_inline_image(&mut self) -> Option<(String, String)> {
        let name = self.image_file_name.take();
        let data = self.image_base64.take();
        match (name, data) {
            (Some(name), Some(data)) if !name.trim().is_empty() && !data.trim().is_empty() => {
                Some((name, data))
            }
            _ => None,
        }
    }

    /// Name of the image blob inside the container, taken from the stored URL.
    #[must_use]
    pub fn image_blob_name(&self) -> Option<&str> {
        let path = self.image_blob_path.as_deref()?;
        let name = path.rsplit('/').next()?;
        (!name.is_empty()).then_some(name)
    }
}

/// An uploaded product image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Create an upload from a client-supplied file name.
    ///
    /// Only the final path segment is kept (some browsers submit the full
    /// client-side path) and characters outside `[A-Za-z0-9._-]` become `_`,
    /// so the blob name is safe to embed in a URL as-is.
    #[must_use]
    pub fn new(file_name: &str, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name)
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self {
            file_name,
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Blob name for this image when attached to the product `row_key`.
    #[must_use]
    pub fn blob_name(&self, row_key: &str) -> String {
        format!("{row_key}_{}", self.file_name)
    }
}

/// Split a full name on the first space into `(first, last)`.
///
/// A single word becomes the first name with an empty last name.
#[must_use]
pub fn split_full_name(full_name: &str) -> (String, String) {
    let trimmed = full_name.trim();
    match trimmed.split_once(' ') {
        Some((first, last)) => (first.to_owned(), last.trim().to_owned()),
        None => (trimmed.to_owned(), String::new()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_defaults_from_sparse_json() {
        let customer: CustomerModel = serde_json::from_str(r#"{"FirstName":"Ada"}"#).unwrap();
        assert_eq!(customer.partition_key, "Customer");
        assert!(customer.row_key.is_empty());
        assert_eq!(customer.first_name, "Ada");
    }

    #[test]
    fn test_fill_missing_keys() {
        let mut customer = CustomerModel {
            partition_key: " ".to_owned(),
            row_key: String::new(),
            ..CustomerModel::default()
        };
        customer.fill_missing_keys();
        assert_eq!(customer.partition_key, "Customer");
        assert!(Uuid::parse_str(&customer.row_key).is_ok());

        let mut product = ProductModel {
            row_key: "keep-me".to_owned(),
            ..ProductModel::default()
        };
        product.fill_missing_keys();
        assert_eq!(product.row_key, "keep-me");
    }

    #[test]
    fn test_product_json_uses_pascal_case_and_numeric_price() {
        let product: ProductModel = serde_json::from_str(
            r#"{"Name":"Mug","Description":"Ceramic","Price":12.5,"ImageFileName":"mug.png","ImageBase64":"AAA="}"#,
        )
        .unwrap();
        assert_eq!(product.partition_key, "Product");
        assert_eq!(product.price, Decimal::new(125, 1));
        assert_eq!(product.image_file_name.as_deref(), Some("mug.png"));

        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["Name"], "Mug");
        assert!(value["Price"].is_number());
        assert!(value.get("name").is_none());
    }

    #[test]
    fn test_take_inline_image_requires_both_parts() {
        let mut product = ProductModel {
            image_file_name: Some("a.png".to_owned()),
            image_base64: None,
            ..ProductModel::default()
        };
        assert!(product.take_inline_image().is_none());
        assert!(product.image_file_name.is_none());

        let mut product = ProductModel {
            image_file_name: Some("a.png".to_owned()),
            image_base64: Some("AAA=".to_owned()),
            ..ProductModel::default()
        };
        assert_eq!(
            product.take_inline_image(),
            Some(("a.png".to_owned(), "AAA=".to_owned()))
        );
        assert!(product.image_base64.is_none());
    }

    #[test]
    fn test_image_blob_name_from_url() {
        let product = ProductModel {
            image_blob_path: Some("/images/abc_mug.png".to_owned()),
            ..ProductModel::default()
        };
        assert_eq!(product.image_blob_name(), Some("abc_mug.png"));

        let product = ProductModel::default();
        assert_eq!(product.image_blob_name(), None);
    }

    #[test]
    fn test_image_upload_strips_client_path() {
        let upload = ImageUpload::new(r"C:\Users\me\mug.png", "image/png", vec![1]);
        assert_eq!(upload.file_name, "mug.png");
        assert_eq!(upload.blob_name("row1"), "row1_mug.png");

        let upload = ImageUpload::new("my photo (1).png", "image/png", vec![1]);
        assert_eq!(upload.file_name, "my_photo__1_.png");
    }

    #[test]
    fn test_split_full_name() {
        assert_eq!(
            split_full_name("Ada Lovelace"),
            ("Ada".to_owned(), "Lovelace".to_owned())
        );
        assert_eq!(
            split_full_name("Jean Luc Picard"),
            ("Jean".to_owned(), "Luc Picard".to_owned())
        );
        assert_eq!(split_full_name(" Cher "), ("Cher".to_owned(), String::new()));
        assert_eq!(split_full_name(""), (String::new(), String::new()));
    }
}

//! Core types for Cloud Retail.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! entity shapes exchanged with table and queue storage.

pub mod email;
pub mod entity;
pub mod id;
pub mod money;
pub mod order_message;
pub mod status;

pub use email::{Email, EmailError};
pub use entity::{
    CUSTOMER_PARTITION, CustomerModel, ImageUpload, PRODUCT_PARTITION, ProductModel,
    split_full_name,
};
pub use id::*;
pub use money::format_money;
pub use order_message::{OrderItem, OrderMessage};
pub use status::*;

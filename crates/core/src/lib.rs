//! Cloud Retail Core - Shared types library.
//!
//! This crate provides common types used across all Cloud Retail components:
//! - `storefront` - Server-rendered shop and admin dashboard
//! - `functions` - JSON API over the storage primitives
//! - `storage` - Table/blob/queue/file-share implementations
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. The [`StorageService`] trait is the seam both binaries
//! program against; implementations live in `cloud-retail-storage`.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, statuses, storage entities
//! - [`storage`] - The storage contract and its error type

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod storage;
pub mod types;

pub use storage::{ContractFile, StorageError, StorageService, StoredBlob};
pub use types::*;

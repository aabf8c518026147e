//! Mediastore Storage Library
//!
//! This crate provides the storage driver abstraction, the S3-compatible and
//! local filesystem drivers, and the [`StorageManager`] that routes calls to a
//! driver by alias and runs multi-key operations concurrently.
//!
//! # Batch semantics
//!
//! `delete_many`, `get_urls` and `get_signed_urls` spawn one task per key
//! against the selected driver, wait for all of them, and either return every
//! result in input order or the first error. Partial results are never
//! returned.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod manager;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_driver, create_manager};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use manager::{StorageManager, StorageRegistry};
pub use mediastore_core::{StorageBackend, Visibility};
#[cfg(feature = "storage-s3")]
pub use s3::{ObjectStorage, ObjectStorageConfig};
pub use traits::{StorageDriver, StorageError, StorageResult};

//! Storage abstraction trait
//!
//! This module defines the StorageDriver trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid default storage: {0}")]
    InvalidDefaultStorage(String),

    #[error("Unknown storage alias: {0}")]
    UnknownStorage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Internal storage error: {0}")]
    Internal(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage driver trait
///
/// Every backend (S3-compatible bucket, local filesystem) implements these five
/// single-key operations. The manager only ever talks to backends through this
/// trait, so drivers must translate their own error shapes into [`StorageError`].
///
/// Drivers are shared across concurrent batch workers and must be `Send + Sync`.
/// A batch worker may drop an in-flight call when a sibling key fails, so
/// implementations should not leave partial state behind at an await point.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Remove the object stored under `key`.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check whether `key` exists.
    ///
    /// Absence is `Ok(false)`; an error is reserved for unexpected failures.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Generate a time-limited URL for a private object.
    ///
    /// Returns an empty string when signing does not apply (public backends).
    async fn get_signed_url(&self, key: &str, expiry: Duration) -> StorageResult<String>;

    /// Direct URL for a public object.
    ///
    /// Returns an empty string when direct access does not apply (private backends).
    async fn get_url(&self, key: &str) -> StorageResult<String>;

    /// Upload `data` under `key` and return the URL callers should use to read it.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

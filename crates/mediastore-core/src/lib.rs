//! Mediastore Core Library
//!
//! This crate provides the configuration and shared storage types used by the
//! storage drivers, the manager, and the CLI.

pub mod config;
pub mod storage_types;

// Re-export commonly used types
pub use config::{DiskConfig, StorageConfig};
pub use storage_types::{StorageBackend, Visibility};

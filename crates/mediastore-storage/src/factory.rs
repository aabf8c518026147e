#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::{ObjectStorage, ObjectStorageConfig};
use crate::{StorageBackend, StorageDriver, StorageError, StorageManager, StorageRegistry, StorageResult};
use mediastore_core::{DiskConfig, StorageConfig};
use std::sync::Arc;

/// Create a storage driver for one configured disk
pub async fn create_driver(disk: &DiskConfig) -> StorageResult<Arc<dyn StorageDriver>> {
    match disk.backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = disk.bucket.clone().ok_or_else(|| {
                StorageError::InvalidConfig(format!("{}: bucket not configured", disk.alias))
            })?;
            let access_key = disk.access_key.clone().ok_or_else(|| {
                StorageError::InvalidConfig(format!("{}: access key not configured", disk.alias))
            })?;
            let secret_key = disk.secret_key.clone().ok_or_else(|| {
                StorageError::InvalidConfig(format!("{}: secret key not configured", disk.alias))
            })?;

            let storage = ObjectStorage::new(ObjectStorageConfig {
                bucket,
                region: disk.region.clone(),
                access_key,
                secret_key,
                endpoint: disk.endpoint.clone(),
                use_ssl: disk.use_ssl,
                visibility: disk.visibility,
                default_expiry: disk.signed_url_expiry,
            })?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::InvalidConfig(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage = LocalStorage::new(
                disk.local_path.clone(),
                disk.local_base_url.clone(),
                disk.visibility,
            )
            .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::InvalidConfig(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

/// Build every configured disk and a manager bound to the default alias
pub async fn create_manager(config: &StorageConfig) -> StorageResult<StorageManager> {
    let mut registry = StorageRegistry::with_capacity(config.disks.len());

    for disk in &config.disks {
        let driver = create_driver(disk).await?;
        tracing::info!(
            alias = %disk.alias,
            backend = %disk.backend,
            visibility = %disk.visibility,
            "Storage disk registered"
        );
        registry.insert(disk.alias.clone(), driver);
    }

    StorageManager::new(config.default_alias.clone(), registry)
}

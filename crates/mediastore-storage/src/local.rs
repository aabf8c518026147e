use crate::keys::{encode_key, validate_key};
use crate::traits::{StorageDriver, StorageError, StorageResult};
use crate::{StorageBackend, Visibility};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    visibility: Visibility,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/mediastore")
    /// * `base_url` - Base URL the root is served under (e.g., "http://localhost:3000/storage")
    /// * `visibility` - Private disks never hand out direct URLs
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        visibility: Visibility,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::InvalidConfig(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            visibility,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// The key policy already rejects `..` segments and absolute keys. The
    /// deepest ancestor of the target that exists on disk is canonicalized and
    /// must stay under the canonical root, so a symlinked directory cannot
    /// redirect reads or writes outside the root even when the file itself
    /// does not exist yet.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;

        let path = self.base_path.join(key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::InvalidConfig(format!("Failed to canonicalize base path: {}", e))
        })?;

        let existing = path
            .ancestors()
            .find(|p| p.symlink_metadata().is_ok())
            .unwrap_or(self.base_path.as_path());
        let canonical = existing.canonicalize().map_err(|e| {
            StorageError::InvalidKey(format!("Failed to resolve storage key: {}", e))
        })?;

        if canonical.strip_prefix(&base_canonical).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    /// URL handed back for a key, empty on private disks
    fn url_for(&self, key: &str) -> String {
        if self.visibility.is_public() {
            self.generate_url(key)
        } else {
            String::new()
        }
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), encode_key(key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageDriver for LocalStorage {
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    key = %key,
                    "Local storage delete failed"
                );
                return Err(StorageError::Internal(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        fs::try_exists(&path).await.map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path.display(),
                key = %key,
                "Local storage exists check failed"
            );
            StorageError::Internal(e.to_string())
        })
    }

    async fn get_signed_url(&self, key: &str, _expiry: Duration) -> StorageResult<String> {
        // Local disks have nothing to sign with.
        self.key_to_path(key)?;
        Ok(String::new())
    }

    async fn get_url(&self, key: &str) -> StorageResult<String> {
        self.key_to_path(key)?;
        Ok(self.url_for(key))
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<String> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::Internal(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::Internal(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::Internal(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(self.url_for(key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

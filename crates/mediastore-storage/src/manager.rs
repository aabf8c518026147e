//! Storage manager
//!
//! The manager routes calls to one driver out of a named registry and turns
//! multi-key calls into concurrent per-key work. It holds no state of its own
//! beyond the shared registry and the selected driver, so cloning or switching
//! alias is cheap.

use crate::traits::{StorageDriver, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Alias to driver mapping shared by every manager built from it.
pub type StorageRegistry = HashMap<String, Arc<dyn StorageDriver>>;

/// Routes storage operations to the driver selected by alias.
#[derive(Clone)]
pub struct StorageManager {
    registry: Arc<StorageRegistry>,
    alias: String,
    driver: Arc<dyn StorageDriver>,
}

impl StorageManager {
    /// Create a manager bound to `default_alias`.
    ///
    /// Fails with [`StorageError::InvalidDefaultStorage`] when the registry is
    /// empty or does not contain `default_alias`.
    pub fn new(default_alias: impl Into<String>, registry: StorageRegistry) -> StorageResult<Self> {
        let alias = default_alias.into();

        if registry.is_empty() {
            return Err(StorageError::InvalidDefaultStorage(format!(
                "{} (no storages registered)",
                alias
            )));
        }

        if registry.keys().any(|a| a.is_empty()) {
            return Err(StorageError::InvalidConfig(
                "storage alias cannot be empty".to_string(),
            ));
        }

        let driver = registry
            .get(&alias)
            .cloned()
            .ok_or_else(|| StorageError::InvalidDefaultStorage(alias.clone()))?;

        tracing::debug!(
            alias = %alias,
            backend = %driver.backend_type(),
            storages = registry.len(),
            "Storage manager created"
        );

        Ok(StorageManager {
            registry: Arc::new(registry),
            alias,
            driver,
        })
    }

    /// Return a manager sharing this registry but bound to `alias`.
    ///
    /// Unknown aliases fail here with [`StorageError::UnknownStorage`] instead
    /// of producing a manager that cannot serve requests.
    pub fn storage(&self, alias: &str) -> StorageResult<Self> {
        let driver = self
            .registry
            .get(alias)
            .cloned()
            .ok_or_else(|| StorageError::UnknownStorage(alias.to_string()))?;

        Ok(StorageManager {
            registry: Arc::clone(&self.registry),
            alias: alias.to_string(),
            driver,
        })
    }

    /// Alias of the driver this manager delegates to.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// All registered aliases, sorted.
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    pub fn has_storage(&self, alias: &str) -> bool {
        self.registry.contains_key(alias)
    }

    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        self.driver.delete(key).await
    }

    /// Delete every key concurrently. Succeeds only if every delete succeeds.
    pub async fn delete_many<S: AsRef<str>>(&self, keys: &[S]) -> StorageResult<()> {
        self.fan_out("delete_many", keys, |driver, key| async move {
            driver.delete(&key).await
        })
        .await
        .map(|_| ())
    }

    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.driver.exists(key).await
    }

    /// Inverse of [`exists`](Self::exists); errors pass through unchanged.
    pub async fn missing(&self, key: &str) -> StorageResult<bool> {
        let exists = self.exists(key).await?;
        Ok(!exists)
    }

    pub async fn get_signed_url(&self, key: &str, expiry: Duration) -> StorageResult<String> {
        self.driver.get_signed_url(key, expiry).await
    }

    /// Signed URLs for every key, in input order.
    pub async fn get_signed_urls<S: AsRef<str>>(
        &self,
        keys: &[S],
        expiry: Duration,
    ) -> StorageResult<Vec<String>> {
        self.fan_out("get_signed_urls", keys, move |driver, key| async move {
            driver.get_signed_url(&key, expiry).await
        })
        .await
    }

    pub async fn get_url(&self, key: &str) -> StorageResult<String> {
        self.driver.get_url(key).await
    }

    /// Direct URLs for every key, in input order.
    pub async fn get_urls<S: AsRef<str>>(&self, keys: &[S]) -> StorageResult<Vec<String>> {
        self.fan_out("get_urls", keys, |driver, key| async move {
            driver.get_url(&key).await
        })
        .await
    }

    pub async fn put(&self, key: &str, data: Bytes) -> StorageResult<String> {
        self.driver.put(key, data).await
    }

    /// Run `op` once per key on the selected driver, one task per key.
    ///
    /// All tasks share a cancellation token. The first failing task cancels
    /// it, and siblings still waiting on their driver call drop that call.
    /// Every task is joined before returning. On failure the error of the
    /// lowest-indexed key among the units that reported one is returned and all
    /// other results are discarded; otherwise `result[i]` belongs to `keys[i]`.
    async fn fan_out<S, T, F, Fut>(
        &self,
        operation: &'static str,
        keys: &[S],
        op: F,
    ) -> StorageResult<Vec<T>>
    where
        S: AsRef<str>,
        T: Send + 'static,
        F: Fn(Arc<dyn StorageDriver>, String) -> Fut,
        Fut: Future<Output = StorageResult<T>> + Send + 'static,
    {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let token = CancellationToken::new();
        let mut workers = JoinSet::new();
        let mut task_index: HashMap<tokio::task::Id, usize> = HashMap::with_capacity(keys.len());

        for (index, key) in keys.iter().enumerate() {
            let unit = op(Arc::clone(&self.driver), key.as_ref().to_string());
            let token = token.clone();

            let handle = workers.spawn(async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => (index, None),
                    result = unit => {
                        if result.is_err() {
                            token.cancel();
                        }
                        (index, Some(result))
                    }
                }
            });
            task_index.insert(handle.id(), index);
        }

        let mut results: Vec<Option<T>> = std::iter::repeat_with(|| None).take(keys.len()).collect();
        let mut first_error: Option<(usize, StorageError)> = None;
        let mut cancelled = 0usize;

        while let Some(joined) = workers.join_next().await {
            let (index, error) = match joined {
                Ok((index, Some(Ok(value)))) => {
                    results[index] = Some(value);
                    continue;
                }
                Ok((_, None)) => {
                    cancelled += 1;
                    continue;
                }
                Ok((index, Some(Err(e)))) => (index, e),
                Err(join_error) => {
                    token.cancel();
                    let index = task_index.get(&join_error.id()).copied().unwrap_or(keys.len());
                    let e = StorageError::Internal(format!("{} worker failed: {}", operation, join_error));
                    (index, e)
                }
            };

            tracing::debug!(
                alias = %self.alias,
                operation,
                index,
                error = %error,
                "Batch unit failed"
            );
            if first_error.as_ref().map_or(true, |(seen, _)| index < *seen) {
                first_error = Some((index, error));
            }
        }

        if let Some((_, e)) = first_error {
            tracing::warn!(
                alias = %self.alias,
                operation,
                keys = keys.len(),
                cancelled,
                error = %e,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Storage batch failed"
            );
            return Err(e);
        }

        tracing::debug!(
            alias = %self.alias,
            operation,
            keys = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Storage batch completed"
        );

        results.into_iter().collect::<Option<Vec<T>>>().ok_or_else(|| {
            StorageError::Internal(format!("{} finished without a result for every key", operation))
        })
    }
}

impl fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageManager")
            .field("alias", &self.alias)
            .field("backend", &self.driver.backend_type())
            .field("aliases", &self.aliases())
            .finish()
    }
}

/// A manager can itself be registered as a driver of another manager.
#[async_trait]
impl StorageDriver for StorageManager {
    async fn delete(&self, key: &str) -> StorageResult<()> {
        StorageManager::delete(self, key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        StorageManager::exists(self, key).await
    }

    async fn get_signed_url(&self, key: &str, expiry: Duration) -> StorageResult<String> {
        StorageManager::get_signed_url(self, key, expiry).await
    }

    async fn get_url(&self, key: &str) -> StorageResult<String> {
        StorageManager::get_url(self, key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<String> {
        StorageManager::put(self, key, data).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.driver.backend_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes keys back as URLs and fails any key starting with `bad`.
    struct EchoDriver {
        calls: AtomicUsize,
        backend: StorageBackend,
    }

    impl EchoDriver {
        fn new(backend: StorageBackend) -> Arc<Self> {
            Arc::new(EchoDriver {
                calls: AtomicUsize::new(0),
                backend,
            })
        }

        fn check(&self, key: &str) -> StorageResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if key.starts_with("bad") {
                return Err(StorageError::Internal(format!("boom: {}", key)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StorageDriver for EchoDriver {
        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.check(key)
        }

        async fn exists(&self, key: &str) -> StorageResult<bool> {
            self.check(key)?;
            Ok(key.starts_with("present"))
        }

        async fn get_signed_url(&self, key: &str, expiry: Duration) -> StorageResult<String> {
            self.check(key)?;
            Ok(format!("signed://{}?ttl={}", key, expiry.as_secs()))
        }

        async fn get_url(&self, key: &str) -> StorageResult<String> {
            self.check(key)?;
            Ok(format!("direct://{}", key))
        }

        async fn put(&self, key: &str, _data: Bytes) -> StorageResult<String> {
            self.check(key)?;
            Ok(format!("direct://{}", key))
        }

        fn backend_type(&self) -> StorageBackend {
            self.backend
        }
    }

    fn registry(entries: &[(&str, Arc<EchoDriver>)]) -> StorageRegistry {
        entries
            .iter()
            .map(|(alias, driver)| (alias.to_string(), Arc::clone(driver) as Arc<dyn StorageDriver>))
            .collect()
    }

    #[test]
    fn new_rejects_empty_alias_in_registry() {
        let driver = EchoDriver::new(StorageBackend::Local);
        let result = StorageManager::new("default", registry(&[("default", driver.clone()), ("", driver)]));
        assert!(matches!(result, Err(StorageError::InvalidConfig(_))));
    }

    #[test]
    fn aliases_are_sorted_and_shared_after_switch() {
        let local = EchoDriver::new(StorageBackend::Local);
        let s3 = EchoDriver::new(StorageBackend::S3);
        let manager =
            StorageManager::new("local", registry(&[("s3", s3), ("local", local)])).unwrap();

        let switched = manager.storage("s3").unwrap();
        assert_eq!(switched.alias(), "s3");
        assert_eq!(manager.alias(), "local");
        assert_eq!(switched.aliases(), vec!["local", "s3"]);
        assert!(Arc::ptr_eq(&manager.registry, &switched.registry));
        assert_eq!(StorageDriver::backend_type(&switched), StorageBackend::S3);
        assert!(manager.has_storage("s3"));
        assert!(!manager.has_storage("gcs"));
    }

    #[tokio::test]
    async fn fan_out_preserves_index_order() {
        let driver = EchoDriver::new(StorageBackend::Local);
        let manager = StorageManager::new("default", registry(&[("default", driver.clone())])).unwrap();

        let keys: Vec<String> = (0..64).map(|i| format!("key-{}", i)).collect();
        let urls = manager.get_urls(&keys).await.unwrap();

        assert_eq!(urls.len(), keys.len());
        for (key, url) in keys.iter().zip(&urls) {
            assert_eq!(url, &format!("direct://{}", key));
        }
        assert_eq!(driver.calls.load(Ordering::SeqCst), 64);
    }

    #[tokio::test]
    async fn manager_can_be_nested_as_driver() {
        let inner_driver = EchoDriver::new(StorageBackend::S3);
        let inner = StorageManager::new("bucket", registry(&[("bucket", inner_driver.clone())])).unwrap();

        let mut outer_registry = StorageRegistry::new();
        outer_registry.insert("nested".to_string(), Arc::new(inner) as Arc<dyn StorageDriver>);
        let outer = StorageManager::new("nested", outer_registry).unwrap();

        assert_eq!(outer.get_url("a.jpg").await.unwrap(), "direct://a.jpg");
        assert!(outer.missing("absent.jpg").await.unwrap());
        assert_eq!(inner_driver.calls.load(Ordering::SeqCst), 2);
    }
}

use async_trait::async_trait;
use bytes::Bytes;
use mediastore_storage::{StorageBackend, StorageDriver, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    pub key: String,
}

/// Recording driver for manager tests.
///
/// URLs are `"{name}://{key}"` (signed ones carry `?expires=<secs>`). Keys
/// registered with `fail_on` return `StorageError::Internal("{name} failed: {key}")`.
/// Keys registered with `delay` sleep before answering, and only count as
/// completed if the sleep was not cut short by cancellation. Keys registered
/// with `rendezvous` block their worker thread until every party of the
/// barrier has arrived, and keys registered with `panic_on` panic.
pub struct MockDriver {
    name: &'static str,
    failing: HashSet<String>,
    existing: HashSet<String>,
    delays: HashMap<String, Duration>,
    barriers: HashMap<String, Arc<Barrier>>,
    panicking: HashSet<String>,
    calls: Mutex<Vec<Call>>,
    completed: AtomicUsize,
}

impl MockDriver {
    pub fn new(name: &'static str) -> Self {
        MockDriver {
            name,
            failing: HashSet::new(),
            existing: HashSet::new(),
            delays: HashMap::new(),
            barriers: HashMap::new(),
            panicking: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn fail_on(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn with_existing(mut self, key: &str) -> Self {
        self.existing.insert(key.to_string());
        self
    }

    pub fn delay(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }

    pub fn rendezvous(mut self, key: &str, barrier: Arc<Barrier>) -> Self {
        self.barriers.insert(key.to_string(), barrier);
        self
    }

    pub fn panic_on(mut self, key: &str) -> Self {
        self.panicking.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.op == op).count()
    }

    /// Keys passed to `op`, sorted (batch calls arrive in any order).
    pub fn keys_for(&self, op: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .calls()
            .into_iter()
            .filter(|c| c.op == op)
            .map(|c| c.key)
            .collect();
        keys.sort();
        keys
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    async fn record(&self, op: &'static str, key: &str) -> StorageResult<()> {
        self.calls.lock().unwrap().push(Call {
            op,
            key: key.to_string(),
        });

        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(barrier) = self.barriers.get(key) {
            barrier.wait();
        }
        if self.panicking.contains(key) {
            panic!("{} panicked on {}", self.name, key);
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(key) {
            return Err(StorageError::Internal(format!("{} failed: {}", self.name, key)));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageDriver for MockDriver {
    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.record("delete", key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.record("exists", key).await?;
        Ok(self.existing.contains(key))
    }

    async fn get_signed_url(&self, key: &str, expiry: Duration) -> StorageResult<String> {
        self.record("get_signed_url", key).await?;
        Ok(format!("{}://{}?expires={}", self.name, key, expiry.as_secs()))
    }

    async fn get_url(&self, key: &str) -> StorageResult<String> {
        self.record("get_url", key).await?;
        Ok(format!("{}://{}", self.name, key))
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<String> {
        self.record("put", key).await?;
        Ok(format!("{}://{}?size={}", self.name, key, data.len()))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

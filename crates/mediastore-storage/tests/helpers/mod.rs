pub mod mock_driver;

use mediastore_storage::{StorageDriver, StorageManager, StorageRegistry};
use mock_driver::MockDriver;
use std::sync::Arc;

/// Registry `{"default": a, "other": b}` and a manager bound to `default`.
pub fn two_storage_manager(a: Arc<MockDriver>, b: Arc<MockDriver>) -> StorageManager {
    let mut registry = StorageRegistry::new();
    registry.insert("default".to_string(), a as Arc<dyn StorageDriver>);
    registry.insert("other".to_string(), b as Arc<dyn StorageDriver>);
    StorageManager::new("default", registry).expect("default storage is registered")
}

pub fn single_storage_manager(driver: Arc<MockDriver>) -> StorageManager {
    let mut registry = StorageRegistry::new();
    registry.insert("default".to_string(), driver as Arc<dyn StorageDriver>);
    StorageManager::new("default", registry).expect("default storage is registered")
}

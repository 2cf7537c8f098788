use std::collections::HashMap;
use std::sync::RwLock;

use crate::storage::errors::StorageError;

use super::types::DurableStore;

/// Process-local durable store, mostly useful for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entry: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        tracing::debug!("Creating new in-memory durable store");
        Self::default()
    }
}

impl DurableStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entry = self
            .entry
            .read()
            .map_err(|_| StorageError::Storage("In-memory store lock poisoned".to_string()))?;
        Ok(entry.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry
            .write()
            .map_err(|_| StorageError::Storage("In-memory store lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entry
            .write()
            .map_err(|_| StorageError::Storage("In-memory store lock poisoned".to_string()))?
            .remove(key);
        Ok(())
    }
}

use crate::storage::errors::StorageError;

/// Key/value store that survives a restart of the client.
///
/// Calls are synchronous and fallible; the token store treats any error as
/// "value absent" and keeps going.
pub trait DurableStore: Send + Sync + 'static {
    /// Get a value from the store.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Put a value into the store, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value from the store. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

use crate::core::error::StorageError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Origin-scoped persistent string storage, the local-storage of the client.
///
/// Implementations must apply a multi-key `remove` as one batch: a concurrent
/// reader sees either all of the keys or none of them.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError>;
}

/// Non-persistent store, lost when the process exits
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// A panic while holding the lock cannot leave the map half-written, so a
/// poisoned lock is still safe to use.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Memory store whose writes can be made to fail, for exercising storage
/// error paths.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct FailingStore {
    pub inner: MemoryStore,
    pub fail_set: bool,
    pub fail_remove: bool,
}

#[cfg(test)]
impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_set {
            return Err(std::io::Error::other("disk full").into());
        }
        self.inner.set(key, value)
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        if self.fail_remove {
            return Err(std::io::Error::other("disk full").into());
        }
        self.inner.remove(keys)
    }
}

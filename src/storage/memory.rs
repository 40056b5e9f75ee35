use std::collections::HashMap;
use std::sync::Mutex;

use super::{entry_size, KeyValueStore, StorageError};

/// In-memory key-value store with a byte quota.
pub struct MemoryKeyValueStore {
    capacity: u64,
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock();
        let others: u64 = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_size(k, v))
            .sum();
        let needed = others + entry_size(key, value);
        if needed > self.capacity {
            return Err(StorageError::QuotaExceeded {
                needed,
                capacity: self.capacity,
            });
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }

    fn usage_bytes(&self) -> Result<u64, StorageError> {
        Ok(self.lock().iter().map(|(k, v)| entry_size(k, v)).sum())
    }

    fn capacity_bytes(&self) -> u64 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryKeyValueStore::new(1024);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
        store.remove("k").unwrap();
    }

    #[test]
    fn quota_rejects_and_keeps_previous_value() {
        let store = MemoryKeyValueStore::new(16);
        store.set("key", "small").unwrap();
        let err = store.set("key", "this value is far too long").unwrap_err();
        assert!(err.is_quota());
        assert_eq!(store.get("key").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn overwrite_does_not_double_count() {
        let store = MemoryKeyValueStore::new(10);
        store.set("ab", "12345678").unwrap();
        store.set("ab", "87654321").unwrap();
        assert_eq!(store.usage_bytes().unwrap(), 10);
    }
}

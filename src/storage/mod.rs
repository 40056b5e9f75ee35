//! Local key-value persistence (the browser local-storage equivalent).
//!
//! Values are JSON strings under fixed keys. Every backend enforces a
//! capacity ceiling; a write past it fails with `QuotaExceeded` and leaves
//! the previous value in place.

pub mod file;
pub mod file_cache;
pub mod memory;

pub use file::FileKeyValueStore;
pub use file_cache::{FileStorage, StoredFile};
pub use memory::MemoryKeyValueStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage quota exceeded: {needed} bytes needed, {capacity} byte capacity")]
    QuotaExceeded { needed: u64, capacity: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch for stored file {0}")]
    ChecksumMismatch(String),

    #[error("Corrupt stored payload: {0}")]
    Corrupt(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Failed to store {name}: {source}")]
    StoreFailed {
        name: String,
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Bytes currently used (keys + values).
    fn usage_bytes(&self) -> Result<u64, StorageError>;

    fn capacity_bytes(&self) -> u64;
}

/// Read and deserialize a JSON value. Absent key → `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// Size a key/value pair counts against the quota.
pub(crate) fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_helpers_round_trip() {
        let store = MemoryKeyValueStore::new(1024);
        write_json(&store, "numbers", &vec![1, 2, 3]).unwrap();
        let back: Option<Vec<i32>> = read_json(&store, "numbers").unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[test]
    fn read_json_absent_key_is_none() {
        let store = MemoryKeyValueStore::new(1024);
        let value: Option<Vec<i32>> = read_json(&store, "missing").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn read_json_malformed_is_serialization_error() {
        let store = MemoryKeyValueStore::new(1024);
        store.set("broken", "{oops").unwrap();
        let result: Result<Option<Vec<i32>>, _> = read_json(&store, "broken");
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }
}

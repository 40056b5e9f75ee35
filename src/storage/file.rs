use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{entry_size, KeyValueStore, StorageError};

/// Key-value store backed by one `<key>.json` file per key.
///
/// Writes go through a temp file in the same directory and are renamed
/// into place, so a crash mid-write never leaves a truncated value.
pub struct FileKeyValueStore {
    dir: PathBuf,
    capacity: u64,
    /// Serializes quota check + write.
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>, capacity: u64) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), capacity, "Opened file key-value store");
        Ok(Self {
            dir,
            capacity,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// (key, size on disk) for every stored entry.
    fn entries(&self) -> Result<Vec<(String, u64)>, StorageError> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            entries.push((stem.to_string(), entry.metadata()?.len()));
        }
        Ok(entries)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let others: u64 = self
            .entries()?
            .into_iter()
            .filter(|(k, _)| k != key)
            .map(|(k, size)| k.len() as u64 + size)
            .sum();
        let needed = others + entry_size(key, value);
        if needed > self.capacity {
            return Err(StorageError::QuotaExceeded {
                needed,
                capacity: self.capacity,
            });
        }

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn usage_bytes(&self) -> Result<u64, StorageError> {
        Ok(self
            .entries()?
            .into_iter()
            .map(|(k, size)| k.len() as u64 + size)
            .sum())
    }

    fn capacity_bytes(&self) -> u64 {
        self.capacity
    }
}

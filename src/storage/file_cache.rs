//! Size-bounded file payload cache kept under a single key-value entry.
//!
//! Payloads are stored base64 encoded next to their SHA-256 checksum.
//! When the backing store runs out of quota the oldest entries are evicted
//! one at a time until the new entry fits. A write that still fails is
//! reported as [`StorageError::StoreFailed`] and, when wired, as an error
//! notification.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{read_json, write_json, KeyValueStore, StorageError};
use crate::notifications::Notifications;
use crate::pipeline::import::{compute_checksum, decode_verified, encode_payload, UploadedFile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub checksum: String,
    /// Base64 payload.
    pub data: String,
    pub stored_at: DateTime<Utc>,
}

pub struct FileStorage {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    max_age: Duration,
    notifications: Option<Arc<Notifications>>,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>, max_age: Duration) -> Self {
        Self {
            kv,
            key: key.into(),
            max_age,
            notifications: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Report store failures to the shared notification buffer.
    pub fn with_notifications(mut self, notifications: Arc<Notifications>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    fn read_all(&self) -> Result<Vec<StoredFile>, StorageError> {
        Ok(read_json(self.kv.as_ref(), &self.key)?.unwrap_or_default())
    }

    /// Store a payload, evicting the oldest entries while the quota is
    /// exceeded. Fails once nothing is left to evict.
    pub fn store(&self, file: &UploadedFile) -> Result<StoredFile, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let entry = StoredFile {
            id: Uuid::new_v4(),
            name: file.name.clone(),
            mime_type: file.effective_mime_type(),
            size: file.size(),
            checksum: compute_checksum(&file.bytes),
            data: encode_payload(&file.bytes),
            stored_at: Utc::now(),
        };

        let now = Utc::now();
        let mut files = self.read_all()?;
        files.retain(|f| now.signed_duration_since(f.stored_at) <= self.max_age);
        files.sort_by_key(|f| f.stored_at);

        let mut evicted = 0usize;
        loop {
            let mut candidate = files.clone();
            candidate.push(entry.clone());
            match write_json(self.kv.as_ref(), &self.key, &candidate) {
                Ok(()) => break,
                Err(e) if e.is_quota() && !files.is_empty() => {
                    let oldest = files.remove(0);
                    tracing::debug!(file_id = %oldest.id, size = oldest.size, "Evicting cached file");
                    evicted += 1;
                }
                Err(e) => {
                    tracing::warn!(file = %entry.name, size = entry.size, evicted, error = %e, "Failed to store file");
                    if let Some(notifications) = &self.notifications {
                        notifications.error(format!("Failed to store file {}", entry.name));
                    }
                    return Err(StorageError::StoreFailed {
                        name: entry.name.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }

        tracing::info!(file_id = %entry.id, file = %entry.name, size = entry.size, evicted, "File stored");
        Ok(entry)
    }

    /// Decoded bytes for `id`, verified against the stored checksum.
    pub fn load(&self, id: &Uuid) -> Result<Option<Vec<u8>>, StorageError> {
        let files = self.read_all()?;
        let Some(entry) = files.iter().find(|f| f.id == *id) else {
            return Ok(None);
        };
        decode_verified(&entry.data, &entry.checksum, &entry.name).map(Some)
    }

    pub fn remove(&self, id: &Uuid) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut files = self.read_all()?;
        let before = files.len();
        files.retain(|f| f.id != *id);
        if files.len() == before {
            return Ok(false);
        }
        write_json(self.kv.as_ref(), &self.key, &files)?;
        Ok(true)
    }

    /// Entries oldest first.
    pub fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
        let mut files = self.read_all()?;
        files.sort_by_key(|f| f.stored_at);
        Ok(files)
    }

    /// Drop entries stored longer than `max_age` ago. Returns how many went.
    pub fn evict_older_than(&self, max_age: Duration) -> Result<usize, StorageError> {
        match Utc::now().checked_sub_signed(max_age) {
            Some(cutoff) => self.evict_stored_before(cutoff),
            // Nothing can be older than the earliest representable instant.
            None => Ok(0),
        }
    }

    /// `evict_older_than` with the configured max age.
    pub fn evict_expired(&self) -> Result<usize, StorageError> {
        self.evict_older_than(self.max_age)
    }

    fn evict_stored_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut files = self.read_all()?;
        let before = files.len();
        files.retain(|f| f.stored_at >= cutoff);
        let evicted = before - files.len();
        if evicted > 0 {
            write_json(self.kv.as_ref(), &self.key, &files)?;
            tracing::info!(evicted, "Expired cached files evicted");
        }
        Ok(evicted)
    }

    /// Sum of stored payload sizes (decoded bytes).
    pub fn usage_bytes(&self) -> Result<u64, StorageError> {
        Ok(self.read_all()?.iter().map(|f| f.size).sum())
    }
}

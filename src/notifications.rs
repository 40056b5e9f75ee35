//! Transient user-facing notifications.
//!
//! Store operations never fail loudly for the user: validation rejects,
//! processing failures and storage write errors all land here as
//! toast-style messages that the presentation layer drains.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::NotificationLevel;

/// Oldest notifications are dropped past this size.
const NOTIFICATION_CAPACITY: usize = 50;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Bounded in-memory notification buffer, shared by every store.
pub struct Notifications {
    buffer: Mutex<VecDeque<Notification>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(NOTIFICATION_CAPACITY)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(level = level.as_str(), %message, "Notification");
        let mut buf = self.lock();
        if buf.len() == NOTIFICATION_CAPACITY {
            buf.pop_front();
        }
        buf.push_back(Notification {
            id: Uuid::new_v4(),
            level,
            message,
            created_at: Utc::now(),
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Error, message);
    }

    /// Snapshot without consuming (for testing or re-render).
    pub fn entries(&self) -> Vec<Notification> {
        self.lock().iter().cloned().collect()
    }

    /// Take everything shown so far.
    pub fn drain(&self) -> Vec<Notification> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_drain() {
        let n = Notifications::new();
        n.success("Uploaded");
        n.error("Failed to store documents");
        assert_eq!(n.len(), 2);

        let drained = n.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, NotificationLevel::Success);
        assert_eq!(drained[1].message, "Failed to store documents");
        assert!(n.is_empty());
    }

    #[test]
    fn oldest_dropped_past_capacity() {
        let n = Notifications::new();
        for i in 0..(NOTIFICATION_CAPACITY + 5) {
            n.info(format!("message {i}"));
        }
        let entries = n.entries();
        assert_eq!(entries.len(), NOTIFICATION_CAPACITY);
        assert_eq!(entries[0].message, "message 5");
    }

    #[test]
    fn poisoned_buffer_still_records() {
        use std::sync::Arc;

        let n = Arc::new(Notifications::new());
        n.info("before");
        let poisoner = Arc::clone(&n);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.buffer.lock().unwrap();
            panic!("panicked while holding the buffer");
        })
        .join();
        assert!(result.is_err());
        assert!(n.buffer.is_poisoned());

        n.error("after");
        assert_eq!(n.len(), 2);
        assert_eq!(n.entries()[1].message, "after");
        assert_eq!(n.drain().len(), 2);
        assert!(n.is_empty());
    }
}

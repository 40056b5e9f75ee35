//! Application state shared by every caller.
//!
//! `CoreState` is built once per session and owns each store. Consumers
//! receive it by reference (usually inside an `Arc`) instead of reaching
//! for global state.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::config::{self, AppConfig, ConfigError};
use crate::document_store::DocumentStore;
use crate::notifications::Notifications;
use crate::pipeline::scheduler::{TaskScheduler, TokioScheduler};
use crate::query::QueryEngine;
use crate::session::SessionStore;
use crate::storage::{FileKeyValueStore, FileStorage, KeyValueStore, StorageError};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("No tokio runtime available for scheduled processing")]
    NoRuntime,
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    config: AppConfig,
    storage: Arc<dyn KeyValueStore>,
    notifications: Arc<Notifications>,
    pub session: SessionStore,
    pub documents: DocumentStore,
    pub queries: QueryEngine,
    pub files: FileStorage,
    shut_down: AtomicBool,
}

impl CoreState {
    /// Wire every store onto `storage` and `scheduler`. Nothing is loaded yet.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn KeyValueStore>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let notifications = Arc::new(Notifications::new());

        let documents = DocumentStore::builder(scheduler)
            .ingest_config(config.ingest.clone())
            .retention(config.retention.clone())
            .persist_to(storage.clone(), config.storage.documents_key.clone())
            .notifications(notifications.clone())
            .build();

        let session = SessionStore::new(
            storage.clone(),
            config.storage.session_key.clone(),
            notifications.clone(),
        );

        let files = FileStorage::new(
            storage.clone(),
            config.storage.files_key.clone(),
            chrono::Duration::try_days(config.retention.file_cache_max_age_days)
                .unwrap_or(chrono::Duration::MAX),
        )
        .with_notifications(notifications.clone());

        let queries = QueryEngine::new(config.query.clone());

        Ok(Self {
            config,
            storage,
            notifications,
            session,
            documents,
            queries,
            files,
            shut_down: AtomicBool::new(false),
        })
    }

    /// File-backed state under the configured data directory, with timers on
    /// the current tokio runtime. Persisted documents and sessions are restored.
    pub fn open(config: AppConfig) -> Result<Self, CoreError> {
        let scheduler = TokioScheduler::current().ok_or(CoreError::NoRuntime)?;
        let dir: PathBuf = config.storage_dir();
        let storage = FileKeyValueStore::open(&dir, config.storage.capacity_bytes)?;
        tracing::info!(data_dir = %dir.display(), version = config::APP_VERSION, "Opening {}", config::APP_NAME);

        let state = Self::new(config, Arc::new(storage), Arc::new(scheduler))?;
        state.restore();
        Ok(state)
    }

    /// Load persisted state. Unreadable entries are reported and skipped.
    pub fn restore(&self) {
        match self.documents.restore() {
            Ok(count) => tracing::debug!(count, "Documents loaded"),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load stored documents");
                self.notifications.error("Failed to load stored documents");
            }
        }
        if let Err(e) = self.session.restore() {
            tracing::warn!(error = %e, "Failed to load stored session");
        }
        match self.files.evict_expired() {
            Ok(0) => {}
            Ok(evicted) => tracing::debug!(evicted, "Expired files evicted at startup"),
            Err(e) => tracing::warn!(error = %e, "Failed to evict expired files"),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    pub fn notifications(&self) -> &Arc<Notifications> {
        &self.notifications
    }

    /// Cancel outstanding processing. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let cancelled = self.documents.shutdown();
        tracing::info!(cancelled, "{} shut down", config::APP_NAME);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Drop for CoreState {
    fn drop(&mut self) {
        self.shutdown();
    }
}

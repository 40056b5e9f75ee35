//! Document store: the authoritative in-memory list of document records.
//!
//! Ingest is two-phase. `ingest` validates, stores the record as
//! `processing` and returns; a scheduled completion later runs the
//! [`DocumentProcessor`] and flips the record to `processed` or `error`.
//!
//! Key properties:
//! - Mutations run to completion under one lock; none partially apply
//! - Completions hold a weak reference, so a dropped store is never touched
//! - `delete`, `cleanup` and `shutdown` cancel pending completions
//! - Each mutation persists before releasing the lock, so storage never
//!   lags behind a later write
//! - After `shutdown` no completion changes a record
//! - Persistence failures are reported, never rolled back into memory state

pub mod cleanup;
pub mod listing;
pub mod stats;

pub use cleanup::CleanupReport;
pub use stats::{DocumentStats, StatusCounts};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use thiserror::Error;

use crate::config::{IngestConfig, RetentionConfig};
use crate::models::{Document, DocumentId, DocumentPage, DocumentPatch, DocumentQuery, DocumentStatus};
use crate::notifications::Notifications;
use crate::pipeline::import::{compute_checksum, encode_payload, validate_upload, IngestError, UploadedFile};
use crate::pipeline::processor::{DocumentProcessor, SimulatedProcessor};
use crate::pipeline::scheduler::{TaskHandle, TaskScheduler};
use crate::storage::{read_json, write_json, KeyValueStore, StorageError};

/// Message given to records whose completion was lost with the previous session.
pub const INTERRUPTED_MESSAGE: &str = "Processing was interrupted";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("Document {id} is {status}; only failed documents can be retried")]
    NotRetryable { id: DocumentId, status: DocumentStatus },
}

// ═══════════════════════════════════════════════════════════
// Shared state
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
struct StoreState {
    /// Newest first.
    documents: Vec<Document>,
    /// Outstanding completion per record.
    pending: HashMap<DocumentId, TaskHandle>,
    /// Set by `shutdown`; checked by completions that slipped past cancellation.
    closed: bool,
}

impl StoreState {
    fn find_mut(&mut self, id: &DocumentId) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == *id)
    }

    fn cancel_pending(&mut self, id: &DocumentId) {
        if let Some(handle) = self.pending.remove(id) {
            handle.cancel();
        }
    }
}

struct Persistence {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

struct Shared {
    state: Mutex<StoreState>,
    ingest: IngestConfig,
    retention: RetentionConfig,
    scheduler: Arc<dyn TaskScheduler>,
    processor: Arc<dyn DocumentProcessor>,
    persistence: Option<Persistence>,
    notifications: Arc<Notifications>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mirror the list into the key-value store. Callers hold the state
    /// lock, so writes land in mutation order. Failures are logged and
    /// surfaced; in-memory state stays authoritative.
    fn persist(&self, documents: &[Document]) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        if let Err(e) = write_json(persistence.store.as_ref(), &persistence.key, documents) {
            tracing::warn!(error = %e, count = documents.len(), "Failed to persist documents");
            self.notifications.error("Failed to store documents");
        }
    }

    fn completion_delay(&self) -> Duration {
        let (min, max) = self.ingest.delay_range();
        if max <= min {
            min
        } else {
            rand::thread_rng().gen_range(min..max)
        }
    }

    fn schedule_completion(self: &Arc<Self>, id: DocumentId) -> TaskHandle {
        let delay = self.completion_delay();
        let weak: Weak<Shared> = Arc::downgrade(self);
        tracing::debug!(document_id = %id, delay_ms = delay.as_millis() as u64, "Completion scheduled");
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.complete(id);
                }
            }),
        )
    }

    /// Scheduled completion: run the processor and record the outcome.
    fn complete(&self, id: DocumentId) {
        let snapshot = {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.pending.remove(&id);
            match state.documents.iter().find(|d| d.id == id) {
                Some(doc) if doc.status() == DocumentStatus::Processing => doc.clone(),
                _ => return,
            }
        };

        let outcome = self.processor.process(&snapshot);

        let mut state = self.lock();
        if state.closed {
            return;
        }
        let Some(doc) = state.find_mut(&id) else {
            return;
        };
        if doc.status() != DocumentStatus::Processing {
            return;
        }
        match outcome {
            Ok(()) => {
                doc.mark_processed(Utc::now());
                tracing::info!(document_id = %id, name = %doc.name, "Document processed");
                self.notifications
                    .success(format!("{} processed successfully", doc.name));
            }
            Err(message) => {
                tracing::warn!(document_id = %id, name = %doc.name, error = %message, "Document processing failed");
                self.notifications
                    .error(format!("Processing failed for {}: {}", doc.name, message));
                doc.mark_failed(message);
            }
        }
        self.persist(&state.documents);
    }
}

/// Records arriving from storage or a seed list: processing records can
/// never complete, so they become retryable errors.
fn prepare_loaded(mut documents: Vec<Document>) -> Vec<Document> {
    for doc in &mut documents {
        if doc.status() == DocumentStatus::Processing {
            doc.mark_failed(INTERRUPTED_MESSAGE);
        } else if doc.repair() {
            tracing::debug!(document_id = %doc.id, "Repaired inconsistent stored record");
        }
    }
    documents
}

// ═══════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════

pub struct DocumentStoreBuilder {
    ingest: IngestConfig,
    retention: RetentionConfig,
    scheduler: Arc<dyn TaskScheduler>,
    processor: Arc<dyn DocumentProcessor>,
    persistence: Option<Persistence>,
    notifications: Option<Arc<Notifications>>,
    documents: Vec<Document>,
}

impl DocumentStoreBuilder {
    pub fn ingest_config(mut self, config: IngestConfig) -> Self {
        self.ingest = config;
        self
    }

    pub fn retention(mut self, config: RetentionConfig) -> Self {
        self.retention = config;
        self
    }

    pub fn processor(mut self, processor: Arc<dyn DocumentProcessor>) -> Self {
        self.processor = processor;
        self
    }

    /// Mirror the list into `store` under `key` after every mutation.
    pub fn persist_to(mut self, store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        self.persistence = Some(Persistence {
            store,
            key: key.into(),
        });
        self
    }

    pub fn notifications(mut self, notifications: Arc<Notifications>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Seed records (newest first).
    pub fn documents(mut self, documents: Vec<Document>) -> Self {
        self.documents = documents;
        self
    }

    pub fn build(self) -> DocumentStore {
        DocumentStore {
            shared: Arc::new(Shared {
                state: Mutex::new(StoreState {
                    documents: prepare_loaded(self.documents),
                    pending: HashMap::new(),
                    closed: false,
                }),
                ingest: self.ingest,
                retention: self.retention,
                scheduler: self.scheduler,
                processor: self.processor,
                persistence: self.persistence,
                notifications: self.notifications.unwrap_or_default(),
            }),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// DocumentStore
// ═══════════════════════════════════════════════════════════

/// Cheap to clone; clones share one store.
#[derive(Clone)]
pub struct DocumentStore {
    shared: Arc<Shared>,
}

impl DocumentStore {
    pub fn builder(scheduler: Arc<dyn TaskScheduler>) -> DocumentStoreBuilder {
        DocumentStoreBuilder {
            ingest: IngestConfig::default(),
            retention: RetentionConfig::default(),
            scheduler,
            processor: Arc::new(SimulatedProcessor),
            persistence: None,
            notifications: None,
            documents: Vec::new(),
        }
    }

    pub fn notifications(&self) -> &Arc<Notifications> {
        &self.shared.notifications
    }

    // ── Reads ────────────────────────────────────────────

    pub fn get(&self, id: &DocumentId) -> Option<Document> {
        self.shared.lock().documents.iter().find(|d| d.id == *id).cloned()
    }

    /// All records, newest first.
    pub fn documents(&self) -> Vec<Document> {
        self.shared.lock().documents.clone()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Completions still scheduled.
    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn stats(&self) -> DocumentStats {
        DocumentStats::compute(&self.shared.lock().documents)
    }

    pub fn list(&self, query: &DocumentQuery) -> DocumentPage {
        listing::list_documents(&self.shared.lock().documents, query)
    }

    // ── Ingest ───────────────────────────────────────────

    /// Validate without ingesting.
    pub fn validate(&self, file: &UploadedFile) -> Result<(), IngestError> {
        let state = self.shared.lock();
        validate_upload(
            file,
            &self.shared.ingest,
            state.documents.iter().map(|d| d.name.as_str()),
        )?;
        Ok(())
    }

    /// Validate, store as `processing`, and schedule completion.
    pub fn ingest(&self, file: UploadedFile) -> Result<DocumentId, IngestError> {
        let mut state = self.shared.lock();
        if let Err(e) = validate_upload(
            &file,
            &self.shared.ingest,
            state.documents.iter().map(|d| d.name.as_str()),
        ) {
            drop(state);
            tracing::info!(file = %file.name, reason = %e, "Upload rejected");
            self.shared.notifications.error(e.to_string());
            return Err(e.into());
        }

        let mut doc = Document::new_processing(
            file.name.clone(),
            file.extension(),
            file.size(),
            Utc::now(),
        );
        doc.checksum = Some(compute_checksum(&file.bytes));
        doc.file_data = Some(encode_payload(&file.bytes));
        let id = doc.id;

        state.documents.insert(0, doc);
        let handle = self.shared.schedule_completion(id);
        state.pending.insert(id, handle);

        tracing::info!(
            document_id = %id,
            file = %file.name,
            size = file.size(),
            "Document ingested"
        );
        self.shared
            .notifications
            .success(format!("{} uploaded successfully", file.name));
        self.shared.persist(&state.documents);
        Ok(id)
    }

    /// Re-run processing for a record in `error`.
    pub fn retry(&self, id: &DocumentId) -> Result<(), StoreError> {
        let mut state = self.shared.lock();
        let doc = state.find_mut(id).ok_or(StoreError::NotFound(*id))?;
        if doc.status() != DocumentStatus::Error {
            return Err(StoreError::NotRetryable {
                id: *id,
                status: doc.status(),
            });
        }
        doc.mark_retrying();
        let name = doc.name.clone();

        let handle = self.shared.schedule_completion(*id);
        state.pending.insert(*id, handle);
        tracing::info!(document_id = %id, name = %name, "Retrying document processing");
        self.shared.notifications.info(format!("Retrying {name}"));
        self.shared.persist(&state.documents);
        Ok(())
    }

    // ── Mutations ────────────────────────────────────────

    /// Merge metadata fields. Returns false if the id is unknown.
    pub fn update(&self, id: &DocumentId, patch: &DocumentPatch) -> bool {
        let mut state = self.shared.lock();
        let Some(doc) = state.find_mut(id) else {
            tracing::debug!(document_id = %id, "Update for unknown document ignored");
            return false;
        };
        if doc.apply(patch) {
            self.shared.persist(&state.documents);
        }
        true
    }

    /// Returns false (with a warning notification) if nothing matched.
    pub fn delete(&self, id: &DocumentId) -> bool {
        let mut state = self.shared.lock();
        let Some(index) = state.documents.iter().position(|d| d.id == *id) else {
            drop(state);
            self.shared.notifications.warning("Document not found");
            return false;
        };
        let removed = state.documents.remove(index);
        state.cancel_pending(id);

        tracing::info!(document_id = %id, name = %removed.name, "Document deleted");
        self.shared
            .notifications
            .success(format!("{} deleted", removed.name));
        self.shared.persist(&state.documents);
        true
    }

    /// Delete every listed record that exists. Returns how many were removed.
    pub fn bulk_delete(&self, ids: &[DocumentId]) -> usize {
        let wanted: HashSet<&DocumentId> = ids.iter().collect();
        let mut state = self.shared.lock();
        let before = state.documents.len();
        let mut removed_ids = Vec::new();
        state.documents.retain(|d| {
            if wanted.contains(&d.id) {
                removed_ids.push(d.id);
                false
            } else {
                true
            }
        });
        for id in &removed_ids {
            state.cancel_pending(id);
        }
        let removed = before - state.documents.len();

        if removed == 0 {
            drop(state);
            self.shared.notifications.warning("No matching documents found");
            return 0;
        }
        tracing::info!(requested = ids.len(), removed, "Bulk delete");
        self.shared
            .notifications
            .success(format!("{removed} documents deleted"));
        self.shared.persist(&state.documents);
        removed
    }

    /// Drop superseded duplicates and `error` records past the retention window.
    pub fn cleanup(&self) -> CleanupReport {
        self.cleanup_at(Utc::now())
    }

    /// `cleanup` against an explicit clock reading.
    pub fn cleanup_at(&self, now: chrono::DateTime<Utc>) -> CleanupReport {
        let retention = chrono::Duration::try_days(self.shared.retention.error_retention_days)
            .unwrap_or(chrono::Duration::MAX);
        let mut state = self.shared.lock();
        let report = cleanup::apply_cleanup(&mut state.documents, now, retention);
        for id in &report.removed_ids {
            state.cancel_pending(id);
        }

        tracing::info!(
            duplicates = report.duplicates_removed,
            stale_errors = report.stale_errors_removed,
            bytes_freed = report.bytes_freed,
            "Cleanup finished"
        );
        if report.removed() == 0 {
            self.shared.notifications.info("Nothing to clean up");
        } else {
            self.shared.notifications.success(format!(
                "Cleanup removed {} documents ({} bytes freed)",
                report.removed(),
                report.bytes_freed
            ));
            self.shared.persist(&state.documents);
        }
        report
    }

    // ── Lifecycle ────────────────────────────────────────

    /// Replace the in-memory list with the persisted one.
    /// Returns the number of records loaded.
    pub fn restore(&self) -> Result<usize, StorageError> {
        let Some(persistence) = &self.shared.persistence else {
            return Ok(0);
        };
        let loaded: Vec<Document> =
            read_json(persistence.store.as_ref(), &persistence.key)?.unwrap_or_default();
        let documents = prepare_loaded(loaded);
        let count = documents.len();

        let mut state = self.shared.lock();
        for (_, handle) in state.pending.drain() {
            handle.cancel();
        }
        state.documents = documents;
        tracing::info!(count, "Documents restored");
        Ok(count)
    }

    /// Cancel every scheduled completion and stop accepting late ones.
    /// Records stay in their current state. Returns how many completions
    /// were cancelled.
    pub fn shutdown(&self) -> usize {
        let mut state = self.shared.lock();
        state.closed = true;
        let count = state.pending.len();
        for (_, handle) in state.pending.drain() {
            handle.cancel();
        }
        if count > 0 {
            tracing::info!(cancelled = count, "Document store shut down");
        }
        count
    }
}

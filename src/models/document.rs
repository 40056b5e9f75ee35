use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::DocumentStatus;

pub type DocumentId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    status: DocumentStatus,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub starred: bool,
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub file_data: Option<String>,
    #[serde(default)]
    processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    error_message: Option<String>,
}

fn first_version() -> u32 {
    1
}

impl Document {
    /// A freshly ingested record, status `processing`.
    pub fn new_processing(name: String, file_type: String, size: u64, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            file_type,
            size,
            uploaded_at,
            status: DocumentStatus::Processing,
            category: None,
            tags: BTreeSet::new(),
            starred: false,
            version: 1,
            checksum: None,
            file_data: None,
            processed_at: None,
            error_message: None,
        }
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn duplicate_key(&self) -> DuplicateKey {
        DuplicateKey {
            name: self.name.clone(),
            size: self.size,
        }
    }

    // ── Status transitions ───────────────────────────────

    pub fn mark_processed(&mut self, at: DateTime<Utc>) {
        self.status = DocumentStatus::Processed;
        self.processed_at = Some(at);
        self.error_message = None;
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = DocumentStatus::Error;
        self.error_message = Some(message.into());
    }

    /// `error → processing`. `processed_at` survives a retry: it records
    /// that the record reached `processed` at least once.
    pub fn mark_retrying(&mut self) {
        self.status = DocumentStatus::Processing;
        self.error_message = None;
    }

    /// Apply a metadata patch. Returns true if anything changed.
    pub fn apply(&mut self, patch: &DocumentPatch) -> bool {
        let mut changed = false;
        if let Some(name) = &patch.name {
            changed |= self.name != *name;
            self.name = name.clone();
        }
        if let Some(category) = &patch.category {
            changed |= self.category != *category;
            self.category = category.clone();
        }
        if let Some(tags) = &patch.tags {
            changed |= self.tags != *tags;
            self.tags = tags.clone();
        }
        if let Some(starred) = patch.starred {
            changed |= self.starred != starred;
            self.starred = starred;
        }
        if let Some(version) = patch.version {
            changed |= self.version != version;
            self.version = version;
        }
        changed
    }

    /// Bring a record loaded from storage back in line with its status.
    /// Returns true if anything was changed.
    pub fn repair(&mut self) -> bool {
        let mut changed = false;
        match self.status {
            DocumentStatus::Error if self.error_message.is_none() => {
                self.error_message = Some("Unknown processing error".into());
                changed = true;
            }
            DocumentStatus::Error => {}
            _ if self.error_message.is_some() => {
                self.error_message = None;
                changed = true;
            }
            _ => {}
        }
        if self.status == DocumentStatus::Processed && self.processed_at.is_none() {
            self.processed_at = Some(self.uploaded_at);
            changed = true;
        }
        changed
    }

    /// Status and the fields tied to it are consistent.
    pub fn is_consistent(&self) -> bool {
        let error_ok = self.error_message.is_some() == (self.status == DocumentStatus::Error);
        let processed_ok = self.status != DocumentStatus::Processed || self.processed_at.is_some();
        error_ok && processed_ok
    }
}

/// User-editable fields. Status only moves through the transition
/// methods on [`Document`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the category.
    pub category: Option<Option<String>>,
    pub tags: Option<BTreeSet<String>>,
    pub starred: Option<bool>,
    pub version: Option<u32>,
}

impl DocumentPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn starred(starred: bool) -> Self {
        Self {
            starred: Some(starred),
            ..Self::default()
        }
    }
}

/// Identity used to spot duplicate uploads during cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DuplicateKey {
    pub name: String,
    pub size: u64,
}

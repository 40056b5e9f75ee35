use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Document, DocumentStatus};

/// Category key used for records without a category.
pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub processing: usize,
    pub processed: usize,
    pub error: usize,
}

/// Derived view over the current records; recomputed on every read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total: usize,
    pub total_bytes: u64,
    pub by_status: StatusCounts,
    pub by_category: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub starred: usize,
}

impl DocumentStats {
    pub fn compute<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut stats = Self::default();
        for doc in documents {
            stats.total += 1;
            stats.total_bytes += doc.size;
            match doc.status() {
                DocumentStatus::Processing => stats.by_status.processing += 1,
                DocumentStatus::Processed => stats.by_status.processed += 1,
                DocumentStatus::Error => stats.by_status.error += 1,
            }
            let category = doc.category.as_deref().unwrap_or(UNCATEGORIZED);
            *stats.by_category.entry(category.to_string()).or_default() += 1;
            *stats.by_type.entry(doc.file_type.clone()).or_default() += 1;
            if doc.starred {
                stats.starred += 1;
            }
        }
        stats
    }
}

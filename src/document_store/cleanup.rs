use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{Document, DocumentId, DocumentStatus, DuplicateKey};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub duplicates_removed: usize,
    pub stale_errors_removed: usize,
    pub bytes_freed: u64,
    pub removed_ids: Vec<DocumentId>,
}

impl CleanupReport {
    pub fn removed(&self) -> usize {
        self.duplicates_removed + self.stale_errors_removed
    }
}

/// Ids of every record that loses to a more recent upload with the same
/// `(name, size)`. On equal timestamps the earlier entry in the list wins.
pub fn superseded_duplicates(documents: &[Document]) -> HashSet<DocumentId> {
    let mut keepers: HashMap<DuplicateKey, &Document> = HashMap::new();
    for doc in documents {
        keepers
            .entry(doc.duplicate_key())
            .and_modify(|keeper| {
                if doc.uploaded_at > keeper.uploaded_at {
                    *keeper = doc;
                }
            })
            .or_insert(doc);
    }
    let kept: HashSet<DocumentId> = keepers.values().map(|d| d.id).collect();
    documents
        .iter()
        .map(|d| d.id)
        .filter(|id| !kept.contains(id))
        .collect()
}

/// `error` records uploaded before `cutoff`.
pub fn stale_errors(documents: &[Document], cutoff: DateTime<Utc>) -> HashSet<DocumentId> {
    documents
        .iter()
        .filter(|d| d.status() == DocumentStatus::Error && d.uploaded_at < cutoff)
        .map(|d| d.id)
        .collect()
}

/// Remove superseded duplicates, then stale error records, in place.
pub(crate) fn apply_cleanup(
    documents: &mut Vec<Document>,
    now: DateTime<Utc>,
    retention: Duration,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    let duplicates = superseded_duplicates(documents);
    documents.retain(|d| {
        if duplicates.contains(&d.id) {
            report.duplicates_removed += 1;
            report.bytes_freed += d.size;
            report.removed_ids.push(d.id);
            false
        } else {
            true
        }
    });

    // A window reaching past the earliest representable instant expires nothing.
    let Some(cutoff) = now.checked_sub_signed(retention) else {
        return report;
    };
    let stale = stale_errors(documents, cutoff);
    documents.retain(|d| {
        if stale.contains(&d.id) {
            report.stale_errors_removed += 1;
            report.bytes_freed += d.size;
            report.removed_ids.push(d.id);
            false
        } else {
            true
        }
    });

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_at(name: &str, size: u64, days_ago: i64) -> Document {
        Document::new_processing(
            name.into(),
            "pdf".into(),
            size,
            Utc::now() - Duration::days(days_ago),
        )
    }

    #[test]
    fn keeps_most_recent_duplicate() {
        let old = doc_at("claim.pdf", 10, 3);
        let new = doc_at("claim.pdf", 10, 1);
        let new_id = new.id;
        let mut docs = vec![old, new];

        let report = apply_cleanup(&mut docs, Utc::now(), Duration::days(30));
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.bytes_freed, 10);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, new_id);
    }

    #[test]
    fn same_name_different_size_is_not_duplicate() {
        let mut docs = vec![doc_at("claim.pdf", 10, 1), doc_at("claim.pdf", 11, 2)];
        let report = apply_cleanup(&mut docs, Utc::now(), Duration::days(30));
        assert_eq!(report.removed(), 0);
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn equal_timestamps_keep_first_entry() {
        let at = Utc::now();
        let first = Document::new_processing("x.pdf".into(), "pdf".into(), 5, at);
        let second = Document::new_processing("x.pdf".into(), "pdf".into(), 5, at);
        let first_id = first.id;
        let losers = superseded_duplicates(&[first, second]);
        assert_eq!(losers.len(), 1);
        assert!(!losers.contains(&first_id));
    }

    #[test]
    fn stale_errors_removed_fresh_errors_kept() {
        let mut stale = doc_at("old.pdf", 100, 40);
        stale.mark_failed("timeout");
        let mut fresh = doc_at("new.pdf", 100, 2);
        fresh.mark_failed("timeout");
        let old_but_fine = doc_at("archive.pdf", 100, 90);
        let mut docs = vec![stale, fresh, old_but_fine];

        let report = apply_cleanup(&mut docs, Utc::now(), Duration::days(30));
        assert_eq!(report.stale_errors_removed, 1);
        assert_eq!(report.bytes_freed, 100);
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.name != "old.pdf"));
    }

    #[test]
    fn shorter_retention_removes_more() {
        let mut err = doc_at("e.pdf", 1, 10);
        err.mark_failed("x");
        let mut docs = vec![err];
        let report = apply_cleanup(&mut docs, Utc::now(), Duration::days(7));
        assert_eq!(report.stale_errors_removed, 1);
    }

    #[test]
    fn unbounded_retention_keeps_every_error() {
        let mut ancient = doc_at("ancient.pdf", 1, 20_000);
        ancient.mark_failed("x");
        let mut docs = vec![ancient, doc_at("dup.pdf", 2, 3), doc_at("dup.pdf", 2, 1)];
        let report = apply_cleanup(&mut docs, Utc::now(), Duration::MAX);
        assert_eq!(report.stale_errors_removed, 0);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(docs.len(), 2);
    }
}

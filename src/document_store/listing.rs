use std::cmp::Ordering;

use crate::models::{Document, DocumentPage, DocumentQuery, SortKey, SortOrder};

/// Filter, sort and paginate. Pages are 1-based; a page past the end
/// comes back empty with the correct totals.
pub fn list_documents(documents: &[Document], query: &DocumentQuery) -> DocumentPage {
    let per_page = query.per_page.max(1);
    let page = query.page.max(1);

    let mut matches: Vec<&Document> = documents
        .iter()
        .filter(|d| query.filter.matches(d))
        .collect();
    matches.sort_by(|a, b| {
        let ord = compare(a, b, query.sort);
        match query.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });

    let total = matches.len();
    let total_pages = total.div_ceil(per_page);
    let items = matches
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .cloned()
        .collect();

    DocumentPage {
        items,
        total,
        page,
        per_page,
        total_pages,
    }
}

fn compare(a: &Document, b: &Document, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::UploadedAt => a.uploaded_at.cmp(&b.uploaded_at),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::Type => a
            .file_type
            .cmp(&b.file_type)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentFilter, DocumentStatus};
    use chrono::{Duration, Utc};

    fn sample() -> Vec<Document> {
        let now = Utc::now();
        let mut docs = Vec::new();
        for (i, (name, ty, size)) in [
            ("Policy.pdf", "pdf", 300),
            ("claim-form.pdf", "pdf", 100),
            ("xray.png", "png", 900),
            ("notes.txt", "txt", 20),
            ("Bill.jpg", "jpg", 450),
        ]
        .into_iter()
        .enumerate()
        {
            let mut d = Document::new_processing(
                name.into(),
                ty.into(),
                size,
                now - Duration::minutes(i as i64),
            );
            if ty == "png" {
                d.mark_failed("unreadable");
            }
            docs.push(d);
        }
        docs[1].tags.insert("urgent".into());
        docs[1].starred = true;
        docs[4].category = Some("billing".into());
        docs
    }

    #[test]
    fn default_query_is_newest_first() {
        let page = list_documents(&sample(), &DocumentQuery::default());
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.items[0].name, "Policy.pdf");
        assert_eq!(page.items[4].name, "Bill.jpg");
    }

    #[test]
    fn sort_by_name_ascending_ignores_case() {
        let query = DocumentQuery {
            sort: SortKey::Name,
            order: SortOrder::Asc,
            ..DocumentQuery::default()
        };
        let names: Vec<String> = list_documents(&sample(), &query)
            .items
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            ["Bill.jpg", "claim-form.pdf", "notes.txt", "Policy.pdf", "xray.png"]
        );
    }

    #[test]
    fn pagination_splits_and_reports_totals() {
        let query = DocumentQuery {
            sort: SortKey::Size,
            order: SortOrder::Asc,
            page: 2,
            per_page: 2,
            ..DocumentQuery::default()
        };
        let page = list_documents(&sample(), &query);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].size, 300);
        assert_eq!(page.items[1].size, 450);
    }

    #[test]
    fn page_past_end_is_empty() {
        let query = DocumentQuery {
            page: 9,
            per_page: 2,
            ..DocumentQuery::default()
        };
        let page = list_documents(&sample(), &query);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 5);
    }

    #[test]
    fn filters_combine() {
        let docs = sample();
        let by_status = DocumentQuery {
            filter: DocumentFilter {
                status: Some(DocumentStatus::Error),
                ..DocumentFilter::default()
            },
            ..DocumentQuery::default()
        };
        assert_eq!(list_documents(&docs, &by_status).total, 1);

        let search_tag = DocumentQuery {
            filter: DocumentFilter {
                search: Some("URGENT".into()),
                starred_only: true,
                ..DocumentFilter::default()
            },
            ..DocumentQuery::default()
        };
        let page = list_documents(&docs, &search_tag);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "claim-form.pdf");

        let by_category_and_type = DocumentQuery {
            filter: DocumentFilter {
                category: Some("billing".into()),
                file_type: Some("JPG".into()),
                ..DocumentFilter::default()
            },
            ..DocumentQuery::default()
        };
        assert_eq!(list_documents(&docs, &by_category_and_type).total, 1);

        let missing_tag = DocumentQuery {
            filter: DocumentFilter {
                tags: vec!["urgent".into(), "missing".into()],
                ..DocumentFilter::default()
            },
            ..DocumentQuery::default()
        };
        assert_eq!(list_documents(&docs, &missing_tag).total, 0);
    }

    #[test]
    fn zero_per_page_is_treated_as_one() {
        let query = DocumentQuery {
            per_page: 0,
            ..DocumentQuery::default()
        };
        let page = list_documents(&sample(), &query);
        assert_eq!(page.per_page, 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages, 5);
    }
}

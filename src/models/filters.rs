use serde::{Deserialize, Serialize};

use super::document::Document;
use super::enums::DocumentStatus;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentFilter {
    /// Case-insensitive match against name and tags.
    pub search: Option<String>,
    pub status: Option<DocumentStatus>,
    pub category: Option<String>,
    pub file_type: Option<String>,
    pub starred_only: bool,
    /// Every listed tag must be present.
    pub tags: Vec<String>,
}

impl DocumentFilter {
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let in_name = doc.name.to_lowercase().contains(&needle);
            let in_tags = doc.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            if !in_name && !in_tags {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != doc.status()) {
            return false;
        }
        if let Some(category) = &self.category {
            if doc.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(file_type) = &self.file_type {
            if !doc.file_type.eq_ignore_ascii_case(file_type) {
                return false;
            }
        }
        if self.starred_only && !doc.starred {
            return false;
        }
        self.tags.iter().all(|t| doc.tags.contains(t))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    #[default]
    UploadedAt,
    Size,
    Type,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// One listing request: filter, sort and page (1-based).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentQuery {
    pub filter: DocumentFilter,
    pub sort: SortKey,
    pub order: SortOrder,
    pub page: usize,
    pub per_page: usize,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            filter: DocumentFilter::default(),
            sort: SortKey::default(),
            order: SortOrder::default(),
            page: 1,
            per_page: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentPage {
    pub items: Vec<Document>,
    /// Matches before pagination.
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

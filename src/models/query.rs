use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Decision, FieldType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub value: String,
}

impl ExtractedField {
    pub fn new(field_type: FieldType, value: impl Into<String>) -> Self {
        Self {
            field_type,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Justification {
    pub text: String,
    pub source: String,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub id: Uuid,
    pub query: String,
    pub decision: Decision,
    pub amount: Option<u64>,
    /// 0-100.
    pub confidence: u8,
    /// Display string, e.g. "2.4s".
    pub processing_time: String,
    pub extracted: Vec<ExtractedField>,
    pub justifications: Vec<Justification>,
    pub created_at: DateTime<Utc>,
}

impl QueryResult {
    pub fn field(&self, field_type: FieldType) -> Option<&str> {
        self.extracted
            .iter()
            .find(|f| f.field_type == field_type)
            .map(|f| f.value.as_str())
    }
}

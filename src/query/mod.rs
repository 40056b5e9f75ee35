//! Mock claim query engine.
//!
//! Free text goes through three fixed phases: field extraction, keyword
//! decision rules, and canned justifications. No document content is
//! consulted.

pub mod decision;
pub mod engine;
pub mod extract;

pub use decision::{decide, justify, Rule, Verdict};
pub use engine::QueryEngine;
pub use extract::extract_fields;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query is empty")]
    EmptyQuery,
}

//! Processing step run when a scheduled ingest completes.
//!
//! There is no real parsing behind it: [`SimulatedProcessor`] accepts every
//! record. The trait exists so the failure path (`processing → error`) and
//! retry can be driven by alternative implementations.

use crate::models::Document;

pub trait DocumentProcessor: Send + Sync {
    /// `Err(message)` moves the record to `error` with that message.
    fn process(&self, document: &Document) -> Result<(), String>;
}

/// Always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedProcessor;

impl DocumentProcessor for SimulatedProcessor {
    fn process(&self, document: &Document) -> Result<(), String> {
        tracing::debug!(
            document_id = %document.id,
            file_type = %document.file_type,
            size = document.size,
            "Simulated processing complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn simulated_processor_accepts_everything() {
        let doc = Document::new_processing("a.pdf".into(), "pdf".into(), 1, Utc::now());
        assert!(SimulatedProcessor.process(&doc).is_ok());
    }
}

pub mod format;
pub mod hash;

pub use format::*;
pub use hash::*;

use thiserror::Error;

/// Why an upload was refused before any record was created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File too large: {}MB exceeds {}MB limit", megabytes(.size), megabytes(.max))]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unsupported file type: .{0}")]
    UnsupportedExtension(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedMimeType(String),

    #[error("A document named \"{0}\" already exists")]
    DuplicateName(String),
}

fn megabytes(bytes: &u64) -> String {
    format!("{:.1}", *bytes as f64 / (1024.0 * 1024.0))
}

impl ValidationError {
    /// Check that produced this error, in evaluation order.
    pub fn check(&self) -> ValidationCheck {
        match self {
            Self::FileTooLarge { .. } => ValidationCheck::Size,
            Self::UnsupportedExtension(_) | Self::UnsupportedMimeType(_) => ValidationCheck::Type,
            Self::DuplicateName(_) => ValidationCheck::Duplicate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCheck {
    Size,
    Type,
    Duplicate,
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not read file: {0}")]
    FileReadError(String),
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{IngestError, ValidationError};
use crate::config::IngestConfig;

/// An upload as handed over by the file picker / drag-and-drop source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    /// Declared MIME type; empty when the source did not provide one.
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: sanitize_filename(&name.into()),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk; the MIME type is guessed from the extension.
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| IngestError::FileReadError(format!("{} has no file name", path.display())))?;
        let bytes = std::fs::read(path)?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        Ok(Self::new(name, mime.essence_str(), bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercase extension without the dot; empty when there is none.
    pub fn extension(&self) -> String {
        file_extension(&self.name)
    }

    /// Declared MIME type, or a guess from the extension when none was given.
    pub fn effective_mime_type(&self) -> String {
        let declared = self.mime_type.trim();
        if declared.is_empty() {
            mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        } else {
            declared.to_ascii_lowercase()
        }
    }
}

pub fn file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Run every upload check and return all failures, in check order:
/// size, extension, MIME type, duplicate name.
pub fn validation_failures<'a, I>(
    file: &UploadedFile,
    config: &IngestConfig,
    existing_names: I,
) -> Vec<ValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut failures = Vec::new();

    if file.size() > config.max_file_size {
        failures.push(ValidationError::FileTooLarge {
            size: file.size(),
            max: config.max_file_size,
        });
    }

    let extension = file.extension();
    if !config.allowed_extensions.iter().any(|e| e.eq_ignore_ascii_case(&extension)) {
        failures.push(ValidationError::UnsupportedExtension(extension));
    }

    let mime = file.effective_mime_type();
    if !config.allowed_mime_types.iter().any(|m| m.eq_ignore_ascii_case(&mime)) {
        failures.push(ValidationError::UnsupportedMimeType(mime));
    }

    if existing_names.into_iter().any(|n| n == file.name) {
        failures.push(ValidationError::DuplicateName(file.name.clone()));
    }

    failures
}

/// All checks run; the first failing one is reported.
pub fn validate_upload<'a, I>(
    file: &UploadedFile,
    config: &IngestConfig,
    existing_names: I,
) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let failures = validation_failures(file, config, existing_names);
    if failures.len() > 1 {
        tracing::debug!(
            file = %file.name,
            failures = ?failures,
            "Upload failed several checks"
        );
    }
    match failures.into_iter().next() {
        Some(first) => Err(first),
        None => Ok(()),
    }
}

/// Sanitize a filename: strip path components and control characters
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0') && !c.is_control())
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}

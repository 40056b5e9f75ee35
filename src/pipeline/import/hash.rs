use base64::Engine;
use sha2::{Digest, Sha256};

use crate::storage::StorageError;

/// SHA-256 content checksum, base64 encoded.
pub fn compute_checksum(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(hash)
}

/// Encode file bytes for storage inside a JSON record.
pub fn encode_payload(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn decode_payload(encoded: &str) -> Result<Vec<u8>, StorageError> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| StorageError::Corrupt(e.to_string()))
}

/// Decode and check the bytes against an expected checksum.
pub fn decode_verified(encoded: &str, expected_checksum: &str, label: &str) -> Result<Vec<u8>, StorageError> {
    let bytes = decode_payload(encoded)?;
    if compute_checksum(&bytes) != expected_checksum {
        return Err(StorageError::ChecksumMismatch(label.to_string()));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_deterministic() {
        let h1 = compute_checksum(b"claim form");
        let h2 = compute_checksum(b"claim form");
        assert_eq!(h1, h2);
    }

    #[test]
    fn different_content_different_checksum() {
        assert_ne!(compute_checksum(b"Content A"), compute_checksum(b"Content B"));
    }

    #[test]
    fn checksum_of_empty_input_is_known_value() {
        // SHA-256("") in base64
        assert_eq!(
            compute_checksum(b""),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn verified_decode_detects_tampering() {
        let payload = encode_payload(b"original");
        let checksum = compute_checksum(b"original");
        assert_eq!(decode_verified(&payload, &checksum, "f").unwrap(), b"original");

        let tampered = encode_payload(b"modified");
        assert!(matches!(
            decode_verified(&tampered, &checksum, "f"),
            Err(StorageError::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn invalid_base64_is_corrupt() {
        assert!(matches!(decode_payload("***"), Err(StorageError::Corrupt(_))));
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "DocIntel";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "DOCINTEL_DATA_DIR";

pub const MIB: u64 = 1024 * 1024;

/// Upper bound for any retention window, in days (about a century).
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Get the application data directory.
/// `$DOCINTEL_DATA_DIR` when set, otherwise ~/DocIntel/.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Name of the key-value store directory inside the data directory.
const STORAGE_DIR_NAME: &str = "storage";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "docintel_lib=info,warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ═══════════════════════════════════════════════════════════
// AppConfig
// ═══════════════════════════════════════════════════════════

/// Top-level configuration. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: Option<PathBuf>,
    pub ingest: IngestConfig,
    pub retention: RetentionConfig,
    pub query: QueryConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Resolved data directory (explicit setting wins over the environment).
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(app_data_dir)
    }

    /// Directory holding the key-value store files.
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir().join(STORAGE_DIR_NAME)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.min_delay_ms > self.ingest.max_delay_ms {
            return Err(ConfigError::Invalid(
                "ingest.min_delay_ms exceeds ingest.max_delay_ms".into(),
            ));
        }
        if self.query.min_delay_ms > self.query.max_delay_ms {
            return Err(ConfigError::Invalid(
                "query.min_delay_ms exceeds query.max_delay_ms".into(),
            ));
        }
        let retention = [
            ("retention.error_retention_days", self.retention.error_retention_days),
            ("retention.file_cache_max_age_days", self.retention.file_cache_max_age_days),
        ];
        for (field, days) in retention {
            if !(0..=MAX_RETENTION_DAYS).contains(&days) {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be within 0-{MAX_RETENTION_DAYS}"
                )));
            }
        }
        if let FallbackPolicy::Fixed { confidence, .. } = self.query.fallback {
            if confidence > 100 {
                return Err(ConfigError::Invalid(
                    "query.fallback confidence must be within 0-100".into(),
                ));
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Sections
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Upload ceiling in bytes (10 MiB).
    pub max_file_size: u64,
    /// Lowercase extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
    pub allowed_mime_types: Vec<String>,
    /// Simulated processing delay range, `[min, max)`.
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * MIB,
            allowed_extensions: ["pdf", "doc", "docx", "txt", "jpg", "jpeg", "png"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_mime_types: [
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "text/plain",
                "image/jpeg",
                "image/png",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            min_delay_ms: 2_000,
            max_delay_ms: 4_000,
        }
    }
}

impl IngestConfig {
    pub fn delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Age after which `error` records are removed by cleanup.
    pub error_retention_days: i64,
    /// Age after which file-cache entries are evicted.
    pub file_cache_max_age_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            error_retention_days: 30,
            file_cache_max_age_days: 7,
        }
    }
}

/// What the query engine does when no keyword rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum FallbackPolicy {
    /// Confidence in `[75, 95)`, amount in `[10_000, 50_000)`.
    Randomized,
    Fixed { confidence: u8, amount: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub fallback: FallbackPolicy,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    pub history_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 2_000,
            max_delay_ms: 3_000,
            fallback: FallbackPolicy::Randomized,
            seed: None,
            history_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Key-value store quota (about 5 MiB, like browser local storage).
    pub capacity_bytes: u64,
    pub documents_key: String,
    pub files_key: String,
    pub session_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 5 * MIB,
            documents_key: "docintel_documents".into(),
            files_key: "docintel_files".into(),
            session_key: "docintel_user".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_docintel() {
        assert_eq!(APP_NAME, "DocIntel");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn storage_dir_under_app_data() {
        let config = AppConfig::default();
        let storage = config.storage_dir();
        assert!(storage.starts_with(config.data_dir()));
        assert!(storage.ends_with("storage"));
    }

    #[test]
    fn explicit_data_dir_wins() {
        let config = AppConfig {
            data_dir: Some(PathBuf::from("/tmp/docintel-test")),
            ..AppConfig::default()
        };
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/docintel-test"));
    }

    #[test]
    fn defaults_match_product_limits() {
        let config = AppConfig::default();
        assert_eq!(config.ingest.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.storage.capacity_bytes, 5 * 1024 * 1024);
        assert_eq!(config.query.min_delay_ms, 2_000);
        assert_eq!(config.query.max_delay_ms, 3_000);
        assert_eq!(config.query.fallback, FallbackPolicy::Randomized);
        assert!(config.ingest.allowed_extensions.contains(&"pdf".to_string()));
    }

    #[test]
    fn load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docintel.json");
        std::fs::write(
            &path,
            r#"{"retention": {"error_retention_days": 7},
                "query": {"fallback": {"mode": "fixed", "confidence": 80, "amount": 20000}}}"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.retention.error_retention_days, 7);
        assert_eq!(config.retention.file_cache_max_age_days, 7);
        assert_eq!(
            config.query.fallback,
            FallbackPolicy::Fixed { confidence: 80, amount: 20_000 }
        );
        assert_eq!(config.ingest.max_file_size, 10 * MIB);
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn validate_rejects_inverted_delay_range() {
        let mut config = AppConfig::default();
        config.ingest.min_delay_ms = 5_000;
        config.ingest.max_delay_ms = 1_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_bounds_retention_windows() {
        let mut config = AppConfig::default();
        config.retention.error_retention_days = 100_000_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.retention.file_cache_max_age_days = -1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.retention.error_retention_days = MAX_RETENTION_DAYS;
        config.retention.file_cache_max_age_days = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn fallback_policy_serializes_tagged() {
        let json = serde_json::to_string(&FallbackPolicy::Randomized).unwrap();
        assert_eq!(json, r#"{"mode":"randomized"}"#);
    }
}

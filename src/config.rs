//! Runtime configuration read from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(value) => split_list(&value),
        Err(_) => default.iter().map(|item| item.to_string()).collect(),
    }
}

/// Split a comma separated setting, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lines that start the footer appended by the list server.
pub const DEFAULT_SIGNATURE_MARKERS: &[&str] = &["---"];

/// Settings for ingestion, rendering and the spool worker.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Directory the mail collaborator drops `.eml` files into.
    pub spool_dir: Option<PathBuf>,
    pub poll_interval: Duration,
    /// Bracketed subject tags stripped during normalization, e.g. `PHP-DEV`.
    pub subject_tags: Vec<String>,
    pub signature_markers: Vec<String>,
    /// Extra function and constant names for token highlighting.
    pub vocabulary_path: Option<PathBuf>,
}

impl ArchiveConfig {
    pub fn from_env() -> Self {
        Self {
            spool_dir: env_path("ARCHIVE_SPOOL_DIR"),
            poll_interval: env_duration_millis("ARCHIVE_POLL_INTERVAL_MS", 30_000),
            subject_tags: env_list("ARCHIVE_SUBJECT_TAGS", &[]),
            signature_markers: env_list("ARCHIVE_SIGNATURE_MARKERS", DEFAULT_SIGNATURE_MARKERS),
            vocabulary_path: env_path("ARCHIVE_VOCABULARY_PATH"),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            spool_dir: None,
            poll_interval: Duration::from_secs(30),
            subject_tags: Vec::new(),
            signature_markers: DEFAULT_SIGNATURE_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
            vocabulary_path: None,
        }
    }
}

//! Config sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how uploads are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Storage root, after `~` and environment variable expansion.
    /// Default: `<temp dir>/mediastore`
    #[serde(default = "StorageSettings::default_root_path")]
    pub root_path: PathBuf,

    /// Largest accepted upload in bytes.
    /// Default: 500 MiB
    #[serde(default = "StorageSettings::default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum folder depth below the root.
    /// Default: 16
    #[serde(default = "StorageSettings::default_max_folder_depth")]
    pub max_folder_depth: usize,

    /// Refused file extensions, as written in the config (the store
    /// normalizes case and leading dots).
    #[serde(default)]
    pub blocked_extensions: Vec<String>,
}

impl StorageSettings {
    pub(crate) fn default_root_path() -> PathBuf {
        std::env::temp_dir().join("mediastore")
    }

    pub(crate) fn default_max_file_size() -> u64 {
        500 * 1024 * 1024
    }

    pub(crate) fn default_max_folder_depth() -> usize {
        16
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root_path: Self::default_root_path(),
            max_file_size: Self::default_max_file_size(),
            max_folder_depth: Self::default_max_folder_depth(),
            blocked_extensions: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySettings {
    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    /// Default: info
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

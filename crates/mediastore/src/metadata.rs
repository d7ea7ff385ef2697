//! Metadata returned for stored files and folders.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length reported by the rejection sentinel.
pub const REJECTED_LENGTH: i64 = -1;

/// A file or folder entry.
///
/// `length` is the byte count for files and 0 for folders. A length of
/// [`REJECTED_LENGTH`] marks an upload that was refused for its size; such
/// entries are never persisted and never come back from a listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub length: i64,
    pub is_folder: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl FileMetadata {
    /// Entry for a regular file.
    pub fn file(
        name: impl Into<String>,
        length: u64,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            length: i64::try_from(length).unwrap_or(i64::MAX),
            is_folder: false,
            created_at,
            modified_at,
        }
    }

    /// Entry for a folder.
    pub fn folder(
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            length: 0,
            is_folder: true,
            created_at,
            modified_at,
        }
    }

    /// Sentinel for an upload that exceeded the size limit.
    pub fn rejected(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: REJECTED_LENGTH,
            is_folder: false,
            created_at: SystemTime::UNIX_EPOCH.into(),
            modified_at: SystemTime::UNIX_EPOCH.into(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.length == REJECTED_LENGTH
    }

    /// Build an entry from what the filesystem reports for `path`.
    ///
    /// Symlinks are followed. Filesystems that cannot report a creation time
    /// get the modification time instead.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created = meta.created().unwrap_or(modified);

        Ok(if meta.is_dir() {
            Self::folder(name, created.into(), modified.into())
        } else {
            Self::file(name, meta.len(), created.into(), modified.into())
        })
    }
}

//! Store configuration.
//!
//! This is the already-resolved view the store needs. Discovering config
//! files, reading environment variables and expanding `$VARS` in the root
//! path is the loader's job (see the `mediaconf` crate).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::path::{PathSanitizer, DEFAULT_REPLACEMENT, HASHES_FOLDER};

/// Default maximum upload size: 500 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Default maximum folder depth below the root.
pub const DEFAULT_MAX_FOLDER_DEPTH: usize = 16;

/// Configuration for a [`FileStore`](crate::FileStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage root. Every stored path resolves below this directory.
    pub root: PathBuf,

    /// Uploads longer than this many bytes are soft-rejected.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum number of path segments below the root.
    #[serde(default = "default_max_folder_depth")]
    pub max_folder_depth: usize,

    /// Blocked extensions, lowercase with a leading dot.
    #[serde(default, deserialize_with = "deserialize_extensions")]
    pub blocked_extensions: BTreeSet<String>,

    /// Names refused as path segments or file names, on top of `.`, `..`
    /// and the sidecar folder.
    #[serde(default)]
    pub reserved_names: BTreeSet<String>,

    /// Replacement for characters that are unsafe in a file name.
    #[serde(default = "default_replacement")]
    pub replacement: char,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_max_folder_depth() -> usize {
    DEFAULT_MAX_FOLDER_DEPTH
}

fn default_replacement() -> char {
    DEFAULT_REPLACEMENT
}

fn deserialize_extensions<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(|e| normalize_extension(e)).collect())
}

/// Extension of a file name: the text after the last dot, without the dot.
///
/// A name that is nothing but a dot and an extension (`.exe`) has one.
/// Returns `None` when there is no dot or nothing follows it.
pub fn extension_of(file_name: &str) -> Option<&str> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Normalize an extension: trimmed, lowercase, with a leading dot.
///
/// Returns `None` for blank input.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(format!(".{ext}"))
    }
}

impl StoreConfig {
    /// Create a config rooted at `root` with default limits.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_folder_depth: DEFAULT_MAX_FOLDER_DEPTH,
            blocked_extensions: BTreeSet::new(),
            reserved_names: BTreeSet::new(),
            replacement: DEFAULT_REPLACEMENT,
        }
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn max_folder_depth(mut self, depth: usize) -> Self {
        self.max_folder_depth = depth;
        self
    }

    /// Block extensions. Accepts `exe`, `.EXE`, `.exe` alike.
    pub fn block_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.blocked_extensions
            .extend(extensions.into_iter().filter_map(|e| normalize_extension(e.as_ref())));
        self
    }

    pub fn reserve_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn replacement(mut self, replacement: char) -> Self {
        self.replacement = replacement;
        self
    }

    /// True if `file_name`'s extension is blocked (case-insensitive).
    pub fn is_blocked(&self, file_name: &str) -> bool {
        extension_of(file_name)
            .and_then(normalize_extension)
            .is_some_and(|e| self.blocked_extensions.contains(&e))
    }

    /// Build the sanitizer for these settings.
    pub fn sanitizer(&self) -> PathSanitizer {
        PathSanitizer::new(self.reserved_names.iter().cloned(), self.max_folder_depth)
            .with_replacement(self.replacement)
    }

    /// Sidecar folder at the storage root.
    pub fn root_hashes_dir(&self) -> PathBuf {
        self.root.join(HASHES_FOLDER)
    }
}

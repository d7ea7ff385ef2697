//! Path and file name validation.
//!
//! Callers address the store with slash-delimited relative paths such as
//! `albums/2024/summer`. Every segment is checked before it gets anywhere
//! near the filesystem: no traversal (`.`/`..`), no reserved names, no
//! characters that are illegal in a path or file name on any platform we
//! run on, and no deeper than the configured folder depth.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::transaction::is_staging_name;

/// Name of the per-directory folder holding hash sidecars.
pub const HASHES_FOLDER: &str = ".hashes";

/// Default replacement for characters that are unsafe in a file name.
pub const DEFAULT_REPLACEMENT: char = '_';

/// Characters that may never appear in a path segment.
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn is_invalid_char(c: char) -> bool {
    c.is_ascii_control() || INVALID_CHARS.contains(&c)
}

/// Replace every character that is unsafe in a file name with `replacement`.
///
/// Idempotent as long as `replacement` is itself a safe character.
pub fn make_safe(name: &str, replacement: char) -> String {
    name.chars()
        .map(|c| if is_invalid_char(c) { replacement } else { c })
        .collect()
}

/// A validated, root-relative location in the store.
///
/// The empty path is the storage root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StoredPath {
    segments: Vec<String>,
}

impl StoredPath {
    /// The storage root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Resolve against a storage root using the platform separator.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.segments);
        path
    }
}

impl fmt::Display for StoredPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Validates paths and names against reserved names, illegal characters
/// and a maximum folder depth.
#[derive(Debug, Clone)]
pub struct PathSanitizer {
    reserved: HashSet<String>,
    max_depth: usize,
    replacement: char,
}

impl PathSanitizer {
    /// Create a sanitizer. `.`, `..` and the sidecar folder name are always
    /// reserved; `extra_reserved` adds to them.
    pub fn new<I, S>(extra_reserved: I, max_depth: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut reserved: HashSet<String> = [".", "..", HASHES_FOLDER]
            .into_iter()
            .map(String::from)
            .collect();
        reserved.extend(extra_reserved.into_iter().map(Into::into));

        Self {
            reserved,
            max_depth,
            replacement: DEFAULT_REPLACEMENT,
        }
    }

    /// Use a different replacement character for unsafe name characters.
    ///
    /// Falls back to the default if `replacement` is itself unsafe.
    pub fn with_replacement(mut self, replacement: char) -> Self {
        self.replacement = if is_invalid_char(replacement) {
            DEFAULT_REPLACEMENT
        } else {
            replacement
        };
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// Validate a slash-delimited relative path.
    ///
    /// Blank input is the root. Leading, trailing or doubled slashes produce
    /// blank segments and are rejected.
    pub fn validate_path(&self, raw: &str) -> Result<StoredPath, StorageError> {
        if raw.trim().is_empty() {
            return Ok(StoredPath::root());
        }

        let parts: Vec<&str> = raw.split('/').collect();
        if parts.len() > self.max_depth {
            return Err(StorageError::InvalidPath(raw.to_string()));
        }

        let segments = parts
            .into_iter()
            .map(|part| {
                self.validate_name(part)
                    .map_err(|_| StorageError::InvalidPath(raw.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoredPath { segments })
    }

    /// Validate a single path segment or file name, returning its safe form.
    ///
    /// Names shaped like in-flight staging files are refused; listings hide
    /// them.
    pub fn validate_name(&self, name: &str) -> Result<String, StorageError> {
        if name.trim().is_empty() || self.reserved.contains(name) || is_staging_name(name) {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        if name.chars().any(is_invalid_char) {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(make_safe(name, self.replacement))
    }
}

impl Default for PathSanitizer {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>(), 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> PathSanitizer {
        PathSanitizer::new(std::iter::empty::<&str>(), 16)
    }

    #[test]
    fn test_blank_is_root() {
        let s = sanitizer();
        assert!(s.validate_path("").unwrap().is_root());
        assert!(s.validate_path("   ").unwrap().is_root());
        assert!(s.validate_path("\t\n").unwrap().is_root());
    }

    #[test]
    fn test_valid_path_segments() {
        let path = sanitizer().validate_path("albums/2024/summer").unwrap();
        assert_eq!(path.segments(), ["albums", "2024", "summer"]);
        assert_eq!(path.to_string(), "albums/2024/summer");
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn test_resolve_uses_platform_separator() {
        let path = sanitizer().validate_path("a/b").unwrap();
        let resolved = path.resolve(Path::new("root"));
        assert_eq!(resolved, Path::new("root").join("a").join("b"));
        assert_eq!(StoredPath::root().resolve(Path::new("root")), PathBuf::from("root"));
    }

    #[test]
    fn test_validate_path_is_idempotent() {
        let s = sanitizer();
        for raw in ["", "a", "a/b/c", "photos/2024 holiday/day-1", "x.y/z_z"] {
            let once = s.validate_path(raw).unwrap();
            let twice = s.validate_path(&once.to_string()).unwrap();
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_traversal_rejected_anywhere() {
        let s = sanitizer();
        for raw in ["..", "a/..", "../a", "a/../b", "a/./b", "."] {
            assert!(
                matches!(s.validate_path(raw), Err(StorageError::InvalidPath(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_hashes_folder_rejected() {
        let s = sanitizer();
        assert!(matches!(
            s.validate_path("a/.hashes"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            s.validate_name(".hashes"),
            Err(StorageError::InvalidName(_))
        ));
    }

    #[test]
    fn test_blank_segments_rejected() {
        let s = sanitizer();
        for raw in ["/a", "a/", "a//b", "a/ /b"] {
            assert!(
                matches!(s.validate_path(raw), Err(StorageError::InvalidPath(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_illegal_characters_rejected() {
        let s = sanitizer();
        for raw in ["<", ">", "|", ":", "a/b*c", "a\\b", "what?", "nul\0byte", "quote\""] {
            assert!(s.validate_path(raw).is_err(), "{raw:?} should be rejected");
        }
        assert!(matches!(
            s.validate_name("a:b"),
            Err(StorageError::InvalidName(_))
        ));
    }

    #[test]
    fn test_depth_limit() {
        let s = sanitizer();
        let at_limit = vec!["d"; 16].join("/");
        assert_eq!(s.validate_path(&at_limit).unwrap().depth(), 16);

        let too_deep = vec!["d"; 17].join("/");
        assert!(matches!(
            s.validate_path(&too_deep),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_depth_checked_even_when_segments_valid() {
        let s = PathSanitizer::new(std::iter::empty::<&str>(), 2);
        assert!(s.validate_path("a/b").is_ok());
        assert!(s.validate_path("a/b/c").is_err());
    }

    #[test]
    fn test_extra_reserved_names() {
        let s = PathSanitizer::new(["thumbs"], 8);
        assert!(s.is_reserved("thumbs"));
        assert!(s.is_reserved(".."));
        assert!(s.validate_name("thumbs").is_err());
        assert!(s.validate_path("a/thumbs").is_err());
        assert!(s.validate_name("thumbs2").is_ok());
    }

    #[test]
    fn test_staging_shaped_names_rejected() {
        let s = sanitizer();
        let staging = "report.123e4567-e89b-12d3-a456-426614174000.tmp";
        assert!(matches!(
            s.validate_name(staging),
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            s.validate_path(&format!("a/{staging}")),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(s.validate_name("report.draft.tmp").is_ok());
    }

    #[test]
    fn test_validate_name_returns_name() {
        let s = sanitizer();
        assert_eq!(s.validate_name("photo.jpg").unwrap(), "photo.jpg");
        assert_eq!(s.validate_name(".profile").unwrap(), ".profile");
        assert_eq!(s.validate_name("über café.png").unwrap(), "über café.png");
    }

    #[test]
    fn test_make_safe_replaces_and_is_idempotent() {
        let safe = make_safe("a<b>c|d", '_');
        assert_eq!(safe, "a_b_c_d");
        assert_eq!(make_safe(&safe, '_'), safe);
        assert_eq!(make_safe("tab\there", '-'), "tab-here");
    }

    #[test]
    fn test_unsafe_replacement_falls_back() {
        let s = sanitizer().with_replacement('/');
        assert_eq!(s.replacement, DEFAULT_REPLACEMENT);
        let s = sanitizer().with_replacement('~');
        assert_eq!(s.replacement, '~');
    }
}

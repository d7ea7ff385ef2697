//! FileStore: hierarchical file storage on the local filesystem.
//!
//! Files live at the path the caller asked for. Next to them, every
//! directory that holds stored files has a `.hashes` folder with one sidecar
//! per file containing the digest of its last committed content:
//!
//! ```text
//! {root}/
//! ├── .hashes/
//! │   └── photo.jpg          # digest of ../photo.jpg
//! ├── photo.jpg
//! └── albums/
//!     ├── .hashes/
//!     │   └── cover.png
//!     └── cover.png
//! ```
//!
//! Re-uploading identical content is detected through the sidecar and
//! skipped. New content is staged beside the destination and renamed over
//! it, so readers see either the old or the new file, never half of one.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::config::{extension_of, StoreConfig};
use crate::error::{IoContext, StorageError};
use crate::hash::{self, ContentHash};
use crate::metadata::FileMetadata;
use crate::path::{PathSanitizer, StoredPath, HASHES_FOLDER};
use crate::transaction;

/// Upload content: anything we can read twice.
pub trait UploadSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> UploadSource for T {}

/// Trait for storage backends.
///
/// This is the whole surface a request layer needs, so an in-memory or
/// remote backend can stand in for the filesystem.
pub trait FileStorage: Send + Sync {
    /// Uploads longer than this are soft-rejected by `save`.
    fn max_file_size(&self) -> u64;

    /// Store `content` as `file_name` in the folder `path`.
    ///
    /// Oversized content is not an error: it yields
    /// [`FileMetadata::rejected`] and touches nothing.
    fn save(
        &self,
        path: &str,
        file_name: &str,
        content: &mut dyn UploadSource,
    ) -> Result<FileMetadata, StorageError>;

    /// Immediate children of the folder `path`. A folder that does not
    /// exist lists as empty.
    fn list(&self, path: &str) -> Result<Vec<FileMetadata>, StorageError>;
}

/// What a save actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// New content was written.
    Written,
    /// The sidecar matched; nothing was written.
    Deduplicated,
    /// Over the size limit; nothing was touched.
    Rejected,
}

/// Total length of a seekable source, leaving its read position unchanged.
pub(crate) fn content_length<R: Seek + ?Sized>(content: &mut R) -> io::Result<u64> {
    let position = content.stream_position()?;
    let end = content.seek(SeekFrom::End(0))?;
    content.seek(SeekFrom::Start(position))?;
    Ok(end)
}

/// Filesystem-based file store.
#[derive(Debug, Clone)]
pub struct FileStore {
    config: StoreConfig,
    sanitizer: PathSanitizer,
}

impl FileStore {
    /// Create a FileStore with the given configuration.
    ///
    /// Creates the root and its sidecar folder if they don't exist.
    pub fn new(config: StoreConfig) -> Result<Self, StorageError> {
        let sanitizer = config.sanitizer();
        ensure_directories(&config.root)?;
        tracing::info!(
            root = %config.root.display(),
            max_file_size = config.max_file_size,
            max_folder_depth = config.max_folder_depth,
            "file store ready"
        );
        Ok(Self { config, sanitizer })
    }

    /// Create a FileStore at a specific path with default limits.
    pub fn at_path(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::new(StoreConfig::with_root(path))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn sanitizer(&self) -> &PathSanitizer {
        &self.sanitizer
    }

    /// Save and report whether anything was written.
    ///
    /// Checks run cheapest first; size, extension and path validation all
    /// happen before the filesystem is touched. `content` is read from its
    /// start, whatever its current position.
    pub fn save_detailed(
        &self,
        path: &str,
        file_name: &str,
        content: &mut dyn UploadSource,
    ) -> Result<(FileMetadata, SaveOutcome), StorageError> {
        content
            .rewind()
            .io_context(|| format!("failed to rewind {file_name}"))?;
        let length =
            content_length(content).io_context(|| format!("failed to measure {file_name}"))?;
        if length > self.config.max_file_size {
            tracing::warn!(
                file = file_name,
                length,
                max = self.config.max_file_size,
                "upload exceeds size limit"
            );
            return Ok((FileMetadata::rejected(file_name), SaveOutcome::Rejected));
        }

        if self.config.is_blocked(file_name) {
            let ext = extension_of(file_name).unwrap_or_default();
            return Err(StorageError::InvalidFileType(format!(".{ext}")));
        }

        let folder = self.sanitizer.validate_path(path)?;
        let safe_name = self.sanitizer.validate_name(file_name)?;

        let directory = folder.resolve(&self.config.root);
        ensure_directories(&directory)?;

        let destination = directory.join(&safe_name);
        let sidecar = directory.join(HASHES_FOLDER).join(&safe_name);

        let digest = hash::digest(content)
            .io_context(|| format!("failed to hash {}", destination.display()))?;

        if destination.is_file() && read_sidecar(&sidecar).as_ref() == Some(&digest) {
            tracing::info!(file = %destination.display(), "already stored, skipping write");
            let meta = metadata_for(&destination)?;
            return Ok((meta, SaveOutcome::Deduplicated));
        }

        match transaction::replace_atomically(content, &destination, &sidecar, &digest) {
            Ok(written) => {
                tracing::info!(file = %destination.display(), bytes = written, %digest, "saved file");
            }
            Err(e) => {
                tracing::error!(file = %destination.display(), error = %e, "error saving file");
                return Err(e);
            }
        }

        Ok((metadata_for(&destination)?, SaveOutcome::Written))
    }

    /// Where a stored file lives, if it exists.
    pub fn file_path(&self, path: &str, file_name: &str) -> Result<Option<PathBuf>, StorageError> {
        let folder = self.sanitizer.validate_path(path)?;
        let name = self.sanitizer.validate_name(file_name)?;
        let full = folder.resolve(&self.config.root).join(name);
        Ok(full.is_file().then_some(full))
    }

    /// Digest recorded for a stored file, if any.
    pub fn stored_digest(
        &self,
        path: &str,
        file_name: &str,
    ) -> Result<Option<ContentHash>, StorageError> {
        let folder = self.sanitizer.validate_path(path)?;
        let name = self.sanitizer.validate_name(file_name)?;
        let sidecar = folder
            .resolve(&self.config.root)
            .join(HASHES_FOLDER)
            .join(name);
        Ok(read_sidecar(&sidecar))
    }

    /// Delete everything under the root and start over empty.
    pub fn purge(&self) -> Result<(), StorageError> {
        tracing::warn!(root = %self.config.root.display(), "dropping storage");
        match fs::remove_dir_all(&self.config.root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StorageError::io(
                    format!("failed to remove {}", self.config.root.display()),
                    e,
                ))
            }
        }
        ensure_directories(&self.config.root)
    }

    fn list_folder(&self, folder: &StoredPath) -> Result<Vec<FileMetadata>, StorageError> {
        let directory = folder.resolve(&self.config.root);
        let entries = match fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::io(
                    format!("failed to list {}", directory.display()),
                    e,
                ))
            }
        };

        let mut folders = Vec::new();
        let mut files = Vec::new();

        for entry in entries {
            let entry =
                entry.io_context(|| format!("failed to list {}", directory.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == HASHES_FOLDER || transaction::is_staging_name(&name) {
                continue;
            }

            match FileMetadata::from_path(&entry.path()) {
                Ok(meta) if meta.is_folder => folders.push(meta),
                Ok(meta) => files.push(meta),
                // Vanished mid-listing, or a dangling symlink.
                Err(e) => tracing::debug!(entry = %name, error = %e, "skipping entry"),
            }
        }

        folders.sort_by(|a, b| a.name.cmp(&b.name));
        files.sort_by(|a, b| a.name.cmp(&b.name));
        folders.extend(files);
        Ok(folders)
    }
}

impl FileStorage for FileStore {
    fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    fn save(
        &self,
        path: &str,
        file_name: &str,
        content: &mut dyn UploadSource,
    ) -> Result<FileMetadata, StorageError> {
        self.save_detailed(path, file_name, content)
            .map(|(meta, _)| meta)
    }

    fn list(&self, path: &str) -> Result<Vec<FileMetadata>, StorageError> {
        let folder = self.sanitizer.validate_path(path)?;
        self.list_folder(&folder)
    }
}

/// Create `folder` and its sidecar folder if absent.
fn ensure_directories(folder: &Path) -> Result<(), StorageError> {
    let hashes = folder.join(HASHES_FOLDER);
    if !hashes.is_dir() {
        fs::create_dir_all(&hashes)
            .io_context(|| format!("failed to create {}", hashes.display()))?;
        tracing::debug!(folder = %folder.display(), "created folder");
    }
    Ok(())
}

/// Sidecar digest, or `None` if missing, unreadable or malformed.
fn read_sidecar(sidecar: &Path) -> Option<ContentHash> {
    let text = fs::read_to_string(sidecar).ok()?;
    text.trim().parse().ok()
}

fn metadata_for(path: &Path) -> Result<FileMetadata, StorageError> {
    FileMetadata::from_path(path).io_context(|| format!("failed to stat {}", path.display()))
}

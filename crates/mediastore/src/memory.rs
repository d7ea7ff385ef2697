//! MemoryStore: an in-memory [`FileStorage`] for tests.
//!
//! Same validation, size policy, dedup and listing rules as [`FileStore`],
//! without touching disk. Folders are implied by the files saved into them.
//!
//! [`FileStore`]: crate::FileStore

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::config::{extension_of, StoreConfig};
use crate::error::{IoContext, StorageError};
use crate::hash::{self, ContentHash};
use crate::metadata::FileMetadata;
use crate::path::{PathSanitizer, StoredPath};
use crate::store::{content_length, FileStorage, SaveOutcome, UploadSource};

#[derive(Debug, Clone)]
struct StoredFile {
    data: Vec<u8>,
    digest: ContentHash,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tree {
    /// Full segment path of every stored file.
    files: BTreeMap<Vec<String>, StoredFile>,
    /// When each folder was first created.
    folders: BTreeMap<Vec<String>, DateTime<Utc>>,
    writes: u64,
}

/// In-memory storage backend.
#[derive(Debug)]
pub struct MemoryStore {
    config: StoreConfig,
    sanitizer: PathSanitizer,
    tree: RwLock<Tree>,
}

impl MemoryStore {
    /// The root path in `config` is ignored.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            sanitizer: config.sanitizer(),
            config,
            tree: RwLock::new(Tree::default()),
        }
    }

    /// Number of physical content writes so far (dedup hits excluded).
    pub fn writes(&self) -> u64 {
        self.tree.read().map(|t| t.writes).unwrap_or_default()
    }

    /// Read back a stored file.
    pub fn contents(&self, path: &str, file_name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = self.file_key(path, file_name)?;
        let tree = self.tree.read().map_err(|_| poisoned())?;
        Ok(tree.files.get(&key).map(|f| f.data.clone()))
    }

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
            return Ok((FileMetadata::rejected(file_name), SaveOutcome::Rejected));
        }
        if self.config.is_blocked(file_name) {
            let ext = extension_of(file_name).unwrap_or_default();
            return Err(StorageError::InvalidFileType(format!(".{ext}")));
        }

        let folder = self.sanitizer.validate_path(path)?;
        let name = self.sanitizer.validate_name(file_name)?;
        let digest = hash::digest(content).io_context(|| format!("failed to hash {name}"))?;

        let mut key = folder.segments().to_vec();
        key.push(name.clone());

        let mut tree = self.tree.write().map_err(|_| poisoned())?;
        let now = Utc::now();
        for depth in 1..=folder.depth() {
            tree.folders
                .entry(folder.segments()[..depth].to_vec())
                .or_insert(now);
        }

        if let Some(existing) = tree.files.get(&key) {
            if existing.digest == digest {
                let meta = file_meta(&name, existing);
                return Ok((meta, SaveOutcome::Deduplicated));
            }
        }

        let mut data = Vec::with_capacity(length as usize);
        content
            .read_to_end(&mut data)
            .io_context(|| format!("failed to read {name}"))?;

        let created_at = tree.files.get(&key).map_or(now, |f| f.created_at);
        let file = StoredFile {
            data,
            digest,
            created_at,
            modified_at: now,
        };
        let meta = file_meta(&name, &file);
        tree.files.insert(key, file);
        tree.writes += 1;

        Ok((meta, SaveOutcome::Written))
    }

    fn file_key(&self, path: &str, file_name: &str) -> Result<Vec<String>, StorageError> {
        let folder = self.sanitizer.validate_path(path)?;
        let mut key = folder.segments().to_vec();
        key.push(self.sanitizer.validate_name(file_name)?);
        Ok(key)
    }

    fn list_folder(&self, folder: &StoredPath) -> Result<Vec<FileMetadata>, StorageError> {
        let tree = self.tree.read().map_err(|_| poisoned())?;
        let prefix = folder.segments();
        let is_child = |key: &Vec<String>| key.len() == prefix.len() + 1 && key.starts_with(prefix);

        let mut entries: Vec<FileMetadata> = tree
            .folders
            .iter()
            .filter(|(key, _)| is_child(key))
            .map(|(key, created)| {
                let name = &key[prefix.len()];
                let modified = tree
                    .files
                    .iter()
                    .filter(|(k, _)| k.starts_with(key))
                    .map(|(_, f)| f.modified_at)
                    .max()
                    .unwrap_or(*created);
                FileMetadata::folder(name.clone(), *created, modified)
            })
            .collect();

        entries.extend(
            tree.files
                .iter()
                .filter(|(key, _)| is_child(key))
                .map(|(key, file)| file_meta(&key[prefix.len()], file)),
        );
        Ok(entries)
    }
}

impl FileStorage for MemoryStore {
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

fn file_meta(name: &str, file: &StoredFile) -> FileMetadata {
    FileMetadata::file(name, file.data.len() as u64, file.created_at, file.modified_at)
}

fn poisoned() -> StorageError {
    StorageError::io("memory store lock poisoned", std::io::Error::other("poisoned"))
}

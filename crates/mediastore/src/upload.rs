//! Caller-side helpers for a request layer sitting on a [`FileStorage`].

use crate::error::StorageError;
use crate::metadata::FileMetadata;
use crate::store::{content_length, FileStorage, UploadSource};

/// One file of a multi-file upload.
pub struct Upload<'a> {
    pub file_name: String,
    pub content: &'a mut dyn UploadSource,
}

impl<'a> Upload<'a> {
    pub fn new(file_name: impl Into<String>, content: &'a mut dyn UploadSource) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }
}

/// Save a batch of uploads into the folder `path`.
///
/// Oversized uploads are skipped with a warning and left out of the result,
/// so the rest of the batch still goes through. The first hard error stops
/// the batch; files saved before it stay saved.
pub fn save_batch<'a, S>(
    storage: &S,
    path: &str,
    uploads: impl IntoIterator<Item = Upload<'a>>,
) -> Result<Vec<FileMetadata>, StorageError>
where
    S: FileStorage + ?Sized,
{
    let max = storage.max_file_size();
    let mut saved = Vec::new();

    for upload in uploads {
        let length = content_length(&mut *upload.content).map_err(|e| {
            StorageError::io(format!("failed to measure {}", upload.file_name), e)
        })?;
        if length > max {
            tracing::warn!(
                file = %upload.file_name,
                length,
                max,
                "file is too large"
            );
            continue;
        }

        let meta = storage.save(path, &upload.file_name, upload.content)?;
        if !meta.is_rejected() {
            saved.push(meta);
        }
    }

    Ok(saved)
}

/// Skip `start` entries and take at most `count`.
pub fn paginate(entries: Vec<FileMetadata>, start: usize, count: usize) -> Vec<FileMetadata> {
    entries.into_iter().skip(start).take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::memory::MemoryStore;
    use std::io::Cursor;

    #[test]
    fn test_batch_skips_oversize() {
        let store = MemoryStore::new(StoreConfig::with_root("unused").max_file_size(4));
        let mut small = Cursor::new(b"abc".to_vec());
        let mut big = Cursor::new(b"abcdefgh".to_vec());
        let mut other = Cursor::new(b"xy".to_vec());

        let saved = save_batch(
            &store,
            "batch",
            [
                Upload::new("small.txt", &mut small),
                Upload::new("big.txt", &mut big),
                Upload::new("other.txt", &mut other),
            ],
        )
        .unwrap();

        let names: Vec<_> = saved.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["small.txt", "other.txt"]);
        assert_eq!(store.list("batch").unwrap().len(), 2);
    }

    #[test]
    fn test_batch_stops_on_error() {
        let store = MemoryStore::new(StoreConfig::with_root("unused"));
        let mut good = Cursor::new(b"ok".to_vec());
        let mut bad = Cursor::new(b"no".to_vec());
        let mut never = Cursor::new(b"never".to_vec());

        let result = save_batch(
            &store,
            "",
            [
                Upload::new("good.txt", &mut good),
                Upload::new("bad|name", &mut bad),
                Upload::new("never.txt", &mut never),
            ],
        );

        assert!(matches!(result, Err(StorageError::InvalidName(_))));
        let names: Vec<_> = store.list("").unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, ["good.txt"]);
    }

    #[test]
    fn test_batch_through_trait_object() {
        let store = MemoryStore::new(StoreConfig::with_root("unused"));
        let storage: &dyn FileStorage = &store;
        let mut content = Cursor::new(vec![1u8; 3]);
        let saved = save_batch(storage, "", [Upload::new("x", &mut content)]).unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn test_paginate() {
        let entries: Vec<_> = (0..5)
            .map(|i| FileMetadata::rejected(format!("f{i}")))
            .collect();

        let page: Vec<_> = paginate(entries.clone(), 1, 2)
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(page, ["f1", "f2"]);

        assert_eq!(paginate(entries.clone(), 4, 10).len(), 1);
        assert!(paginate(entries, 10, 10).is_empty());
    }
}

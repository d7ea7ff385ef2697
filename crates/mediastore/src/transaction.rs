//! WriteTransaction: roll back filesystem artifacts unless committed.
//!
//! A save touches up to three paths: the staging file, the destination and
//! the hash sidecar. The transaction is created with the paths it is allowed
//! to clean up. Anything still pending when it goes out of scope (early
//! return, `?`, panic unwind) is deleted.
//!
//! The write protocol in [`replace_atomically`]:
//!
//! ```text
//! {dir}/
//! ├── photo.jpg.<uuid>.tmp   # 1. content staged here (same volume)
//! ├── photo.jpg              # 2. staging renamed over this
//! └── .hashes/
//!     └── photo.jpg          # 3. new digest written here, then commit
//! ```

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{IoContext, StorageError};
use crate::hash::ContentHash;

const STAGING_SUFFIX: &str = "tmp";

/// Guard that deletes every pending path on drop.
#[derive(Debug, Default)]
pub struct WriteTransaction {
    pending: HashSet<PathBuf>,
}

impl WriteTransaction {
    /// Start a transaction guarding `paths`.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            pending: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Start guarding another path.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.pending.insert(path.into());
    }

    /// Keep one path; it will no longer be cleaned up.
    pub fn commit(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Keep everything.
    pub fn commit_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.contains(path)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Path> {
        self.pending.iter().map(PathBuf::as_path)
    }

    /// End the transaction now, deleting whatever is still pending.
    pub fn close(self) {}

    fn rollback(&mut self) {
        for path in self.pending.drain() {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "rolled back"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "rollback failed")
                }
            }
        }
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        self.rollback();
    }
}

/// Staging path for `destination`: `<destination>.<uuid>.tmp`, same directory.
pub fn staging_path_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.{}", Uuid::new_v4(), STAGING_SUFFIX));
    destination.with_file_name(name)
}

/// True if `name` looks like a staging file produced by [`staging_path_for`].
pub fn is_staging_name(name: &str) -> bool {
    let Some(rest) = name
        .strip_suffix(STAGING_SUFFIX)
        .and_then(|r| r.strip_suffix('.'))
    else {
        return false;
    };
    match rest.rsplit_once('.') {
        Some((base, id)) => !base.is_empty() && Uuid::parse_str(id).is_ok(),
        None => false,
    }
}

/// Stage `content` next to `destination`, rename it into place and record
/// `digest` in `sidecar`.
///
/// On failure every artifact this call created is removed. A destination
/// that existed beforehand is never deleted: before the rename it still
/// holds its old content, after the rename it holds the new content, and in
/// both cases its sidecar is removed so the next save rewrites it.
pub fn replace_atomically<R: Read + ?Sized>(
    content: &mut R,
    destination: &Path,
    sidecar: &Path,
    digest: &ContentHash,
) -> Result<u64, StorageError> {
    let staging = staging_path_for(destination);

    let mut tx = WriteTransaction::new([staging.clone(), sidecar.to_path_buf()]);
    if !destination.exists() {
        tx.track(destination);
    }

    let file = File::create(&staging)
        .io_context(|| format!("failed to create staging file {}", staging.display()))?;
    let mut writer = BufWriter::new(file);
    let written = io::copy(content, &mut writer)
        .io_context(|| format!("failed to write staging file {}", staging.display()))?;
    let file = writer
        .into_inner()
        .map_err(|e| StorageError::io("failed to flush staging file", e.into_error()))?;
    file.sync_all()
        .io_context(|| format!("failed to sync staging file {}", staging.display()))?;
    drop(file);

    fs::rename(&staging, destination).io_context(|| {
        format!(
            "failed to move {} into {}",
            staging.display(),
            destination.display()
        )
    })?;

    fs::write(sidecar, digest.as_str())
        .io_context(|| format!("failed to write hash sidecar {}", sidecar.display()))?;

    tx.commit_all();
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_uncommitted_paths_are_deleted() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        fs::write(&a, "a")?;
        fs::write(&b, "b")?;

        {
            let _tx = WriteTransaction::new([&a, &b]);
        }

        assert!(!a.exists());
        assert!(!b.exists());
        Ok(())
    }

    #[test]
    fn test_partial_commit_keeps_committed_path() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let keep = temp_dir.path().join("keep");
        let lose = temp_dir.path().join("lose");
        fs::write(&keep, "k")?;
        fs::write(&lose, "l")?;

        let mut tx = WriteTransaction::new([&keep, &lose]);
        tx.commit(&keep);
        assert!(!tx.is_pending(&keep));
        assert!(tx.is_pending(&lose));
        tx.close();

        assert!(keep.exists());
        assert!(!lose.exists());
        Ok(())
    }

    #[test]
    fn test_full_commit_keeps_everything() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let a = temp_dir.path().join("a");
        fs::write(&a, "a")?;

        let mut tx = WriteTransaction::new([&a]);
        tx.track(temp_dir.path().join("never-created"));
        tx.commit_all();
        assert_eq!(tx.pending().count(), 0);
        drop(tx);

        assert!(a.exists());
        Ok(())
    }

    #[test]
    fn test_missing_paths_are_ignored() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let tx = WriteTransaction::new([temp_dir.path().join("nope")]);
        tx.close();
        Ok(())
    }

    #[test]
    fn test_rollback_on_early_return() -> Result<()> {
        fn failing_step(path: &Path) -> Result<(), StorageError> {
            let _tx = WriteTransaction::new([path]);
            fs::write(path, "partial").io_context(|| "write")?;
            Err(StorageError::io("simulated", io::Error::other("boom")))
        }

        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("partial");
        assert!(failing_step(&path).is_err());
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_staging_path_is_sibling_and_unique() {
        let dest = Path::new("/store/albums/photo.jpg");
        let a = staging_path_for(dest);
        let b = staging_path_for(dest);
        assert_ne!(a, b);
        assert_eq!(a.parent(), dest.parent());

        let name = a.file_name().and_then(|n| n.to_str()).expect("utf-8 name");
        assert!(name.starts_with("photo.jpg."));
        assert!(is_staging_name(name));
    }

    #[test]
    fn test_is_staging_name() {
        assert!(!is_staging_name("photo.jpg"));
        assert!(!is_staging_name("notes.tmp"));
        assert!(!is_staging_name("photo.jpg.not-a-uuid.tmp"));
        assert!(!is_staging_name(&format!(".{}.tmp", Uuid::new_v4())));
        assert!(is_staging_name(&format!("x.{}.tmp", Uuid::new_v4())));
    }

    #[test]
    fn test_replace_atomically_writes_content_and_sidecar() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dest = temp_dir.path().join("photo.jpg");
        let sidecar = temp_dir.path().join("photo.jpg.hash");
        let digest = ContentHash::from_data(b"0123456789");

        let written = replace_atomically(&mut Cursor::new(b"0123456789"), &dest, &sidecar, &digest)?;

        assert_eq!(written, 10);
        assert_eq!(fs::read(&dest)?, b"0123456789");
        assert_eq!(fs::read_to_string(&sidecar)?, digest.as_str());
        assert_eq!(fs::read_dir(temp_dir.path())?.count(), 2);
        Ok(())
    }

    #[test]
    fn test_replace_atomically_overwrites() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dest = temp_dir.path().join("f");
        let sidecar = temp_dir.path().join("f.hash");
        fs::write(&dest, "old")?;

        let digest = ContentHash::from_data(b"new content");
        replace_atomically(&mut Cursor::new(b"new content"), &dest, &sidecar, &digest)?;

        assert_eq!(fs::read(&dest)?, b"new content");
        Ok(())
    }

    #[test]
    fn test_replace_atomically_rolls_back_when_sidecar_dir_missing() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dest = temp_dir.path().join("fresh.bin");
        let sidecar = temp_dir.path().join("no-such-dir").join("fresh.bin");
        let digest = ContentHash::from_data(b"abc");

        let err = replace_atomically(&mut Cursor::new(b"abc"), &dest, &sidecar, &digest)
            .expect_err("sidecar write should fail");

        assert!(!err.is_client_error());
        assert!(!dest.exists(), "newly created destination must be rolled back");
        assert_eq!(fs::read_dir(temp_dir.path())?.count(), 0);
        Ok(())
    }
}

//! Storage errors.

use std::io;
use thiserror::Error;

/// Errors returned by [`FileStorage`](crate::FileStorage) implementations.
///
/// The first three variants are rejected before any I/O happens and are the
/// caller's fault. `Io` means the disk refused us; any partial artifacts have
/// already been rolled back by the time it is returned.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("file extension [{0}] is not allowed")]
    InvalidFileType(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Wrap an I/O error with a short description of what we were doing.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True for errors caused by bad input rather than the storage backend.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

/// Attach context to `io::Result`s, in the spirit of `anyhow::Context`.
pub(crate) trait IoContext<T> {
    fn io_context<C, F>(self, f: F) -> Result<T, StorageError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<C, F>(self, f: F) -> Result<T, StorageError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| StorageError::io(f(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(StorageError::InvalidPath("..".into()).is_client_error());
        assert!(StorageError::InvalidName(".hashes".into()).is_client_error());
        assert!(StorageError::InvalidFileType(".exe".into()).is_client_error());

        let io = StorageError::io("disk", io::Error::other("full"));
        assert!(!io.is_client_error());
    }

    #[test]
    fn test_io_context_message() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result.io_context(|| "failed to read sidecar").unwrap_err();
        assert_eq!(err.to_string(), "failed to read sidecar: gone");
    }

    #[test]
    fn test_file_type_message() {
        let err = StorageError::InvalidFileType(".exe".into());
        assert_eq!(err.to_string(), "file extension [.exe] is not allowed");
    }
}

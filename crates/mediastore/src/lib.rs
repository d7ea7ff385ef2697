//! Hierarchical file storage with content deduplication and atomic writes.
//!
//! Clients address files by a slash-delimited folder path plus a file name.
//! The store guarantees:
//!
//! - **No traversal**: every path segment is validated before any I/O
//! - **No partial files**: content is staged and renamed into place
//! - **Idempotent re-upload**: a per-file hash sidecar lets identical
//!   content skip the write
//! - **Rollback**: artifacts of a failed save are cleaned up
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mediastore::{FileStorage, FileStore, StoreConfig};
//! use std::io::Cursor;
//!
//! let config = StoreConfig::with_root("/srv/media")
//!     .max_file_size(10 * 1024 * 1024)
//!     .block_extensions(["exe", "bat"]);
//! let store = FileStore::new(config).unwrap();
//!
//! let meta = store
//!     .save("albums/2024", "cover.jpg", &mut Cursor::new(vec![0u8; 512]))
//!     .unwrap();
//! assert_eq!(meta.length, 512);
//!
//! for entry in store.list("albums").unwrap() {
//!     println!("{} folder={} {} bytes", entry.name, entry.is_folder, entry.length);
//! }
//! ```
//!
//! # Oversized uploads
//!
//! Content longer than [`FileStorage::max_file_size`] is not an error: `save`
//! returns [`FileMetadata::rejected`] (length `-1`) and touches nothing, so a
//! batch of uploads can partially succeed. [`save_batch`] filters these out.
//!
//! # Concurrency
//!
//! There is no cross-operation lock. Concurrent saves to the same file race
//! on the final rename and the last one wins; readers always see a complete
//! file. The sidecar is written after the rename, so a crash in between
//! leaves a stale digest that the next save detects and repairs.

pub mod config;
pub mod error;
pub mod hash;
pub mod memory;
pub mod metadata;
pub mod path;
pub mod store;
pub mod transaction;
pub mod upload;

// Re-exports for convenience
pub use config::StoreConfig;
pub use error::StorageError;
pub use hash::{ContentHash, HashError};
pub use memory::MemoryStore;
pub use metadata::FileMetadata;
pub use path::{PathSanitizer, StoredPath, HASHES_FOLDER};
pub use store::{FileStorage, FileStore, SaveOutcome, UploadSource};
pub use transaction::WriteTransaction;
pub use upload::{paginate, save_batch, Upload};

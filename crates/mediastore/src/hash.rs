//! ContentHash: a BLAKE3 digest truncated to 160 bits (40 hex chars).
//!
//! The digest is what goes into a file's hash sidecar. Truncating BLAKE3 keeps
//! the sidecar the same width as a SHA-1 hex string while staying fast on
//! large uploads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Seek};
use std::str::FromStr;
use thiserror::Error;

/// Number of digest bytes kept from the BLAKE3 output.
pub const DIGEST_BYTES: usize = 20;

/// A content hash - 160 bits (20 bytes, 40 hex chars) of BLAKE3.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

/// Errors that can occur when parsing content hashes.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("invalid hash length: expected 40 hex chars, got {0}")]
    InvalidLength(usize),

    #[error("invalid hex character in hash")]
    InvalidHex,
}

impl ContentHash {
    /// Hash an in-memory buffer.
    pub fn from_data(data: &[u8]) -> Self {
        Self::from_hasher(blake3::Hasher::new().update(data))
    }

    fn from_hasher(hasher: &blake3::Hasher) -> Self {
        let hash_bytes = hasher.finalize();
        Self(hex::encode(&hash_bytes.as_bytes()[..DIGEST_BYTES]))
    }

    /// Create from an existing hash string (validates format).
    pub fn from_str_checked(s: &str) -> Result<Self, HashError> {
        if s.len() != DIGEST_BYTES * 2 {
            return Err(HashError::InvalidLength(s.len()));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::InvalidHex);
        }
        Ok(Self(s.to_lowercase()))
    }

    /// Get the full hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Hash the whole of a seekable source, then rewind it.
///
/// Hashing always starts from the beginning, whatever the current position,
/// so the digest covers exactly the bytes a later copy from the start reads.
/// Sources that cannot seek (sockets, pipes) must be buffered by the caller
/// first.
pub fn digest<R: Read + Seek + ?Sized>(source: &mut R) -> io::Result<ContentHash> {
    let mut hasher = blake3::Hasher::new();
    source.rewind()?;
    io::copy(source, &mut hasher)?;
    source.rewind()?;
    Ok(ContentHash::from_hasher(&hasher))
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_checked(s)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, SeekFrom};

    #[test]
    fn test_from_data_produces_40_hex_chars() {
        let hash = ContentHash::from_data(b"Hello, World!");
        assert_eq!(hash.as_str().len(), 40);
        assert!(hash
            .as_str()
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_from_data_is_deterministic() {
        let hash1 = ContentHash::from_data(b"test data");
        let hash2 = ContentHash::from_data(b"test data");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_from_data_different_input_different_hash() {
        let hash1 = ContentHash::from_data(b"data a");
        let hash2 = ContentHash::from_data(b"data b");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_digest_matches_from_data() {
        let data = vec![7u8; 256 * 1024];
        let mut cursor = Cursor::new(data.clone());
        assert_eq!(digest(&mut cursor).unwrap(), ContentHash::from_data(&data));
    }

    #[test]
    fn test_digest_rewinds_source() {
        let mut cursor = Cursor::new(b"rewind me".to_vec());
        digest(&mut cursor).unwrap();
        assert_eq!(cursor.stream_position().unwrap(), 0);

        let mut copied = String::new();
        cursor.read_to_string(&mut copied).unwrap();
        assert_eq!(copied, "rewind me");
    }

    #[test]
    fn test_digest_covers_whole_source_from_any_position() {
        let mut cursor = Cursor::new(b"skip:payload".to_vec());
        cursor.seek(SeekFrom::Start(5)).unwrap();
        let hash = digest(&mut cursor).unwrap();
        assert_eq!(hash, ContentHash::from_data(b"skip:payload"));
        assert_eq!(cursor.stream_position().unwrap(), 0);
    }

    #[test]
    fn test_digest_of_empty_source() {
        let mut cursor = Cursor::new(Vec::new());
        assert_eq!(digest(&mut cursor).unwrap(), ContentHash::from_data(b""));
    }

    #[test]
    fn test_from_str_valid_lowercases() {
        let upper = "ABCDEF0123456789ABCDEF0123456789ABCDEF01";
        let hash: ContentHash = upper.parse().unwrap();
        assert_eq!(hash.as_str(), upper.to_lowercase());
    }

    #[test]
    fn test_from_str_invalid_length() {
        let result: Result<ContentHash, _> = "short".parse();
        assert!(matches!(result, Err(HashError::InvalidLength(5))));
    }

    #[test]
    fn test_from_str_invalid_hex() {
        let result: Result<ContentHash, _> = "z".repeat(40).parse();
        assert!(matches!(result, Err(HashError::InvalidHex)));
    }

    #[test]
    fn test_serde_is_transparent() {
        let hash = ContentHash::from_data(b"serde test");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash));
        let restored: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, restored);
    }
}

//! Content digests (SHA-1 / SHA-256) for files on disk and bodies in flight.
//!
//! Files are always hashed in fixed-size chunks so memory stays bounded no
//! matter how large the mod or installer jar is.

use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::TransferError;

const BUF_SIZE: usize = 64 * 1024;

/// Hash function named by a file entry's `hash_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Parse a `hash_type` token. Empty means "no verification" and yields `None`.
    pub fn parse(token: &str) -> Result<Option<Self>, TransferError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }
        match token.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Some(HashAlgorithm::Sha1)),
            "sha256" => Ok(Some(HashAlgorithm::Sha256)),
            _ => Err(TransferError::UnsupportedAlgorithm(token.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    pub fn hasher(self) -> StreamHasher {
        match self {
            HashAlgorithm::Sha1 => StreamHasher::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => StreamHasher::Sha256(Sha256::new()),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incremental hasher fed chunk by chunk (e.g. from a curl write callback).
#[derive(Clone)]
pub enum StreamHasher {
    Sha1(Sha1),
    Sha256(Sha256),
}

impl StreamHasher {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            StreamHasher::Sha1(h) => h.update(data),
            StreamHasher::Sha256(h) => h.update(data),
        }
    }

    /// Finish and return the digest as lowercase hex.
    pub fn finalize_hex(self) -> String {
        match self {
            StreamHasher::Sha1(h) => hex::encode(h.finalize()),
            StreamHasher::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

/// Compute the digest of a file and return it as lowercase hex.
pub fn digest(path: &Path, algorithm: HashAlgorithm) -> Result<String, TransferError> {
    let mut f = File::open(path).map_err(|e| TransferError::io(path, e))?;
    let mut hasher = algorithm.hasher();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf).map_err(|e| TransferError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

/// True if the file's digest equals `expected_hex` (case-insensitive).
pub fn verify(
    path: &Path,
    expected_hex: &str,
    algorithm: HashAlgorithm,
) -> Result<bool, TransferError> {
    let actual = digest(path, algorithm)?;
    Ok(hex_eq(&actual, expected_hex))
}

/// Case-insensitive comparison of two hex digests (surrounding whitespace ignored).
pub fn hex_eq(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sha256_empty_file() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let d = digest(f.path(), HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            d,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_known_content() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let d = digest(f.path(), HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            d,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn sha1_known_content() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let d = digest(f.path(), HashAlgorithm::Sha1).unwrap();
        assert_eq!(d, "f572d396fae9206628714fb2ce00f72e94f2258f");
    }

    #[test]
    fn larger_than_buffer_matches_stream_hasher() {
        let body: Vec<u8> = (0u8..=255).cycle().take(BUF_SIZE * 3 + 17).collect();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&body).unwrap();
        f.flush().unwrap();

        let mut h = HashAlgorithm::Sha256.hasher();
        for chunk in body.chunks(1000) {
            h.update(chunk);
        }
        assert_eq!(digest(f.path(), HashAlgorithm::Sha256).unwrap(), h.finalize_hex());
    }

    #[test]
    fn verify_is_case_insensitive() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        assert!(verify(f.path(), "F572D396FAE9206628714FB2CE00F72E94F2258F", HashAlgorithm::Sha1).unwrap());
        assert!(!verify(f.path(), "0000", HashAlgorithm::Sha1).unwrap());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = digest(&dir.path().join("nope"), HashAlgorithm::Sha1).unwrap_err();
        assert!(matches!(err, TransferError::Io { .. }));
    }

    #[test]
    fn parse_tokens() {
        assert_eq!(HashAlgorithm::parse("sha1").unwrap(), Some(HashAlgorithm::Sha1));
        assert_eq!(HashAlgorithm::parse("SHA256").unwrap(), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::parse("").unwrap(), None);
        assert!(matches!(
            HashAlgorithm::parse("md5"),
            Err(TransferError::UnsupportedAlgorithm(t)) if t == "md5"
        ));
    }
}

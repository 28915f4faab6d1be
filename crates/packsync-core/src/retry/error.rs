//! Error of a single download attempt against one URL.

use std::fmt;

/// Why one candidate URL failed. Absorbed by the transfer unit, which moves on
/// to the next candidate; only the last one is reported upward as text.
#[derive(Debug)]
pub enum AttemptError {
    /// Curl reported an error (timeout, connection, DNS, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// Body downloaded but its digest did not match the published hash.
    ChecksumMismatch { expected: String, actual: String },
    /// Writing the body to the destination failed (disk full, permissions).
    Storage(std::io::Error),
    /// URL could not be parsed.
    InvalidUrl(String),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Curl(e) => write!(f, "{}", e),
            AttemptError::Http(code) => write!(f, "HTTP {}", code),
            AttemptError::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch: expected {}, got {}", expected, actual)
            }
            AttemptError::Storage(e) => write!(f, "storage: {}", e),
            AttemptError::InvalidUrl(u) => write!(f, "invalid url: {}", u),
        }
    }
}

impl std::error::Error for AttemptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttemptError::Curl(e) => Some(e),
            AttemptError::Storage(e) => Some(e),
            AttemptError::Http(_)
            | AttemptError::ChecksumMismatch { .. }
            | AttemptError::InvalidUrl(_) => None,
        }
    }
}

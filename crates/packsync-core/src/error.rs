//! Errors surfaced by the download engine (transfer unit and coordinator).
//!
//! Per-URL failures never reach this type; they are absorbed by the transfer
//! unit as [`crate::transfer::AttemptError`] and only summarized here once every
//! candidate URL for a file has failed.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    /// Local filesystem failure (create dir, open, remove). Fatal, not retried.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// `hash_type` was set to something other than `sha1` / `sha256`.
    #[error("unsupported hash algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    /// Every candidate URL for one file failed.
    #[error(
        "failed to download {file}: all {} url(s) failed ({}); last error: {last_error}",
        .attempted_urls.len(),
        .attempted_urls.join(", ")
    )]
    ExhaustedMirrors {
        file: String,
        attempted_urls: Vec<String>,
        last_error: String,
    },

    /// Two tasks in one batch target the same path.
    #[error("more than one download targets {}", .0.display())]
    DuplicateDestination(PathBuf),

    #[error("download worker panicked")]
    WorkerPanicked,
}

impl TransferError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TransferError::Io {
            path: path.into(),
            source,
        }
    }

    /// Name of the file that exhausted its mirrors, if that is what failed.
    pub fn failed_file(&self) -> Option<&str> {
        match self {
            TransferError::ExhaustedMirrors { file, .. } => Some(file),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_mirrors_lists_every_url() {
        let e = TransferError::ExhaustedMirrors {
            file: "mods/a.jar".into(),
            attempted_urls: vec!["http://a/x".into(), "http://b/x".into()],
            last_error: "HTTP 500".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("mods/a.jar"));
        assert!(msg.contains("all 2 url(s)"));
        assert!(msg.contains("http://a/x, http://b/x"));
        assert!(msg.contains("HTTP 500"));
        assert_eq!(e.failed_file(), Some("mods/a.jar"));
    }

    #[test]
    fn unsupported_algorithm_display() {
        let e = TransferError::UnsupportedAlgorithm("md5".into());
        assert_eq!(e.to_string(), "unsupported hash algorithm 'md5'");
        assert_eq!(e.failed_file(), None);
    }
}

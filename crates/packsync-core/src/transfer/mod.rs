//! Transfer unit: fetch one file from its primary URL or mirrors and verify it.
//!
//! Candidates are tried in order (primary, then mirrors). Each attempt streams
//! into the destination path; a failed attempt (HTTP error, network error,
//! digest mismatch) removes the file before the next candidate is tried, so a
//! file is only ever left on disk when it verified.

mod attempt;

pub use crate::retry::AttemptError;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checksum;
use crate::error::TransferError;
use crate::manifest::{destination_path, FileEntry, UnsafePath};
use crate::retry::{classify, RetryDecision, RetryPolicy};
use crate::storage::DestinationFile;

/// One unit of work: an entry and where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub entry: FileEntry,
    pub destination: PathBuf,
}

impl DownloadTask {
    pub fn new(entry: FileEntry, destination: impl Into<PathBuf>) -> Self {
        Self {
            entry,
            destination: destination.into(),
        }
    }

    /// Task for `entry` placed under `install_dir` at its catalog path.
    pub fn for_install(install_dir: &Path, entry: FileEntry) -> Result<Self, UnsafePath> {
        let destination = destination_path(install_dir, &entry)?;
        Ok(Self { entry, destination })
    }
}

/// HTTP knobs for each attempt.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub connect_timeout: Duration,
    /// Whole-request cap; zero disables it.
    pub request_timeout: Duration,
    /// Bytes/sec below which a transfer counts as stalled.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(1800),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            user_agent: format!("packsync/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryPolicy::default(),
        }
    }
}

/// Successful transfer: which URL served the file and how much was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub url: String,
    pub bytes: u64,
    /// Total attempts across all candidates, including the successful one.
    pub attempts: u32,
}

/// Download `task.entry` to `task.destination`, trying each candidate URL until
/// one yields a body whose digest matches.
///
/// An unsupported `hash_type` fails before any network access. Local write
/// failures abort immediately as [`TransferError::Io`]; every other failure
/// moves on to the next candidate.
pub fn transfer(
    task: &DownloadTask,
    opts: &TransferOptions,
) -> Result<TransferOutcome, TransferError> {
    let entry = &task.entry;
    let algorithm = entry.algorithm()?;
    let candidates = entry.candidate_urls();
    let label = entry.display_path();

    let mut attempted_urls: Vec<String> = Vec::with_capacity(candidates.len());
    let mut last_error: Option<AttemptError> = None;
    let mut attempts = 0u32;

    for url in candidates {
        attempted_urls.push(url.clone());
        let mut url_attempt = 0u32;
        loop {
            url_attempt += 1;
            attempts += 1;
            let mut file = DestinationFile::create(&task.destination)?;
            let mut hasher = algorithm.map(|a| a.hasher());

            let fetched = attempt::fetch_once(&url, &mut file, &mut hasher, opts);
            let result = fetched.and_then(|()| match hasher {
                Some(h) => {
                    let actual = h.finalize_hex();
                    if checksum::hex_eq(&actual, &entry.content_hash) {
                        Ok(())
                    } else {
                        Err(AttemptError::ChecksumMismatch {
                            expected: entry.content_hash.trim().to_ascii_lowercase(),
                            actual,
                        })
                    }
                }
                None => Ok(()),
            });

            let err = match result {
                Ok(()) => {
                    let bytes = file.finish().map_err(|e| TransferError::io(&task.destination, e))?;
                    tracing::debug!(file = %label, url = %url, bytes, attempts, "downloaded");
                    return Ok(TransferOutcome { url, bytes, attempts });
                }
                Err(e) => e,
            };

            file.discard()?;
            let kind = classify(&err);
            let decision = opts.retry.decide(url_attempt, kind);
            tracing::warn!(file = %label, url = %url, ?kind, ?decision, "attempt failed: {}", err);
            match decision {
                RetryDecision::SameUrl => {}
                RetryDecision::NextCandidate => {
                    last_error = Some(err);
                    break;
                }
                RetryDecision::Abort => {
                    return Err(match err {
                        AttemptError::Storage(source) => TransferError::Io {
                            path: task.destination.clone(),
                            source,
                        },
                        other => TransferError::ExhaustedMirrors {
                            file: label,
                            attempted_urls,
                            last_error: other.to_string(),
                        },
                    });
                }
            }
        }
    }

    Err(TransferError::ExhaustedMirrors {
        file: label,
        attempted_urls,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no candidate url".to_string()),
    })
}

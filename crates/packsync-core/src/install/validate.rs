//! Re-hash installed files against the manifest and re-fetch the bad ones.

use anyhow::Result;
use std::fmt;
use std::path::Path;

use super::plan::build_tasks;
use crate::checksum::{digest, hex_eq};
use crate::coordinator::{self, DownloadSummary, Progress, ProgressStats};
use crate::manifest::{destination_path, FileEntry, InstalledManifest};
use crate::transfer::TransferOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    Missing,
    Mismatch { actual: String },
}

/// One installed file that no longer matches its manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalid {
    pub entry: FileEntry,
    pub problem: Problem,
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            Problem::Missing => write!(f, "{}: missing", self.entry.display_path()),
            Problem::Mismatch { actual } => write!(
                f,
                "{}: {} is {}, expected {}",
                self.entry.display_path(),
                self.entry.hash_type,
                actual,
                self.entry.content_hash
            ),
        }
    }
}

/// Every manifest entry with a hash whose file is missing or hashes differently.
/// Entries without a hash are not checked.
pub fn validate_install(install_dir: &Path, manifest: &InstalledManifest) -> Result<Vec<Invalid>> {
    let mut invalid = Vec::new();
    let mut checked = 0usize;
    for entry in &manifest.file_set {
        let Some(algorithm) = entry.algorithm()? else {
            continue;
        };
        checked += 1;
        let path = destination_path(install_dir, entry)?;
        if !path.is_file() {
            invalid.push(Invalid {
                entry: entry.clone(),
                problem: Problem::Missing,
            });
            continue;
        }
        let actual = digest(&path, algorithm)?;
        if !hex_eq(&actual, &entry.content_hash) {
            invalid.push(Invalid {
                entry: entry.clone(),
                problem: Problem::Mismatch { actual },
            });
        }
    }
    tracing::info!(checked, invalid = invalid.len(), "validated {}", install_dir.display());
    Ok(invalid)
}

/// Delete and re-download `invalid` through the coordinator.
pub fn repair(
    install_dir: &Path,
    invalid: &[Invalid],
    limit: usize,
    opts: &TransferOptions,
    progress: &Progress,
    progress_tx: Option<&tokio::sync::mpsc::Sender<ProgressStats>>,
) -> Result<DownloadSummary> {
    let entries: Vec<&FileEntry> = invalid.iter().map(|i| &i.entry).collect();
    super::plan::prune(install_dir, entries.iter().copied())?;
    let tasks = build_tasks(install_dir, entries)?;
    for task in &tasks {
        tracing::warn!("re-downloading {}", task.entry.display_path());
    }
    Ok(coordinator::run(tasks, limit, opts, progress, progress_tx)?)
}

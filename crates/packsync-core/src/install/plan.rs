//! What kind of install this is, and which files to delete and fetch.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::diff::{diff, DiffResult};
use crate::logging::LOG_FILE_NAME;
use crate::manifest::{destination_path, FileEntry, FileSet, InstalledManifest};
use crate::storage::remove_if_exists;
use crate::transfer::DownloadTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallKind {
    /// Nothing installed yet (or a forced install over foreign content).
    Fresh,
    /// Same pack and version: every file is fetched again.
    Reinstall,
    Update,
    /// Older version of the installed pack; needs `force`.
    Downgrade,
}

impl InstallKind {
    /// Whether the previous file set is diffed and pruned.
    pub fn is_incremental(self) -> bool {
        matches!(self, InstallKind::Update | InstallKind::Downgrade)
    }
}

impl fmt::Display for InstallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstallKind::Fresh => "fresh install",
            InstallKind::Reinstall => "reinstall",
            InstallKind::Update => "update",
            InstallKind::Downgrade => "downgrade",
        })
    }
}

/// Install refused without `--force`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstallRefused {
    #[error("{} is not empty and has no manifest; use --force to install anyway", .0.display())]
    NotEmpty(PathBuf),
    #[error(
        "{installed} (pack {installed_id}) is installed here, not pack {requested_id}; \
         use --force to replace it"
    )]
    DifferentPack {
        installed: String,
        installed_id: u64,
        requested_id: u64,
    },
    #[error("{pack} would be downgraded from {from} to {to}; use --force to downgrade")]
    Downgrade { pack: String, from: String, to: String },
}

pub fn classify(
    install_dir: &Path,
    existing: Option<&InstalledManifest>,
    next: &InstalledManifest,
    force: bool,
) -> Result<InstallKind> {
    let Some(old) = existing else {
        if !force && !is_empty_dir(install_dir)? {
            return Err(InstallRefused::NotEmpty(install_dir.to_path_buf()).into());
        }
        return Ok(InstallKind::Fresh);
    };

    if old.pack_id != next.pack_id {
        if !force {
            return Err(InstallRefused::DifferentPack {
                installed: old.pack_name.clone(),
                installed_id: old.pack_id,
                requested_id: next.pack_id,
            }
            .into());
        }
        tracing::warn!(
            "replacing pack {} with pack {} (forced)",
            old.pack_id,
            next.pack_id
        );
        return Ok(InstallKind::Fresh);
    }

    if next.version_id == old.version_id {
        Ok(InstallKind::Reinstall)
    } else if next.version_id > old.version_id {
        Ok(InstallKind::Update)
    } else if force {
        tracing::warn!("forcing downgrade from {} to {}", old.version_name, next.version_name);
        Ok(InstallKind::Downgrade)
    } else {
        Err(InstallRefused::Downgrade {
            pack: next.pack_name.clone(),
            from: old.version_name.clone(),
            to: next.version_name.clone(),
        }
        .into())
    }
}

/// Missing directories count as empty, and so does a directory holding
/// nothing but our own log.
pub fn is_empty_dir(dir: &Path) -> Result<bool> {
    let entries = match std::fs::read_dir(dir) {
        Ok(it) => it,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e).with_context(|| format!("read dir {}", dir.display())),
    };
    for entry in entries {
        let entry = entry.with_context(|| format!("read dir {}", dir.display()))?;
        if entry.file_name() != LOG_FILE_NAME {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Files to delete and files to fetch for one install run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub diff: DiffResult,
    pub downloads: FileSet,
}

impl SyncPlan {
    /// Fetch everything, delete nothing.
    pub fn full(next: &FileSet) -> Self {
        Self {
            diff: DiffResult::default(),
            downloads: next.clone(),
        }
    }

    pub fn unchanged(&self) -> usize {
        self.diff.unchanged.len()
    }
}

/// Diff the installed set against the new one; unchanged files are not fetched.
pub fn prepare_sync(old: &FileSet, next: &FileSet) -> SyncPlan {
    let result = diff(old, next);
    let downloads = result.download_set(next);
    SyncPlan {
        diff: result,
        downloads,
    }
}

/// Delete the local copies of `entries`; already-missing files are fine.
pub fn prune<'a>(
    install_dir: &Path,
    entries: impl IntoIterator<Item = &'a FileEntry>,
) -> Result<usize> {
    let mut removed = 0;
    for entry in entries {
        let path = destination_path(install_dir, entry)?;
        if path.exists() {
            remove_if_exists(&path)?;
            tracing::debug!("pruned {}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}

pub fn build_tasks<'a>(
    install_dir: &Path,
    entries: impl IntoIterator<Item = &'a FileEntry>,
) -> Result<Vec<DownloadTask>> {
    entries
        .into_iter()
        .map(|e| DownloadTask::for_install(install_dir, e.clone()).map_err(anyhow::Error::from))
        .collect()
}

//! Install or update a modpack version into a directory.
//!
//! Order of operations: resolve the version, classify against the installed
//! manifest, delete changed and removed files, download the rest together
//! with the loader artifacts and the Java runtime, unpack the runtime, run the
//! loader installer, optionally validate, and only then write the new
//! manifest. Any failure before the last step leaves the previous manifest in
//! place.

mod name;
mod plan;
mod validate;

pub use name::parse_installer_name;
pub use plan::{
    build_tasks, classify, is_empty_dir, prepare_sync, prune, InstallKind, InstallRefused, SyncPlan,
};
pub use validate::{repair, validate_install, Invalid, Problem};

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::InstallerConfig;
use crate::coordinator::{self, DownloadSummary, Progress, ProgressStats};
use crate::http::HttpClient;
use crate::manifest::{
    destination_path, read_manifest, write_manifest, FileEntry, FileKey, InstalledManifest,
};
use crate::modloader::{InstallContext, LoaderEndpoints, ModLoader};
use crate::provider::{select_version, ModpackProvider};
use crate::runtime::{extract_runtime, java_relative_path, runtime_download, RUNTIME_DIR};

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub install_dir: PathBuf,
    /// Explicit version; otherwise the newest release (or newest of any
    /// channel with `latest`).
    pub version_id: Option<u64>,
    pub latest: bool,
    pub force: bool,
    /// Re-hash every file after installing and repair mismatches.
    pub validate: bool,
    pub skip_modloader: bool,
    /// Use `java` from the config or PATH instead of a bundled runtime.
    pub no_java: bool,
    /// Overrides the configured worker count.
    pub threads: Option<usize>,
}

/// What an install run did.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallReport {
    pub kind: InstallKind,
    pub pack_name: String,
    pub version_name: String,
    pub version_id: u64,
    pub downloads: DownloadSummary,
    pub pruned: usize,
    pub unchanged: usize,
    pub repaired: usize,
    pub loader: Option<&'static str>,
    /// Bundled runtime the server launches with, relative to the install dir.
    pub java: Option<PathBuf>,
}

/// Bundled Java runtime for one install run.
#[derive(Debug, Clone)]
struct JavaRuntime {
    version: String,
    /// `jre/<version>/bin/java`, relative to the install dir.
    launch: PathBuf,
    /// Archive to fetch; `None` when the runtime is already unpacked.
    archive: Option<FileEntry>,
}

pub struct Installer {
    config: InstallerConfig,
    options: InstallOptions,
    endpoints: LoaderEndpoints,
    progress: Progress,
}

impl Installer {
    pub fn new(config: InstallerConfig, options: InstallOptions) -> Self {
        Self {
            config,
            options,
            endpoints: LoaderEndpoints::default(),
            progress: Progress::new(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: LoaderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Shared handle to the download counters.
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    /// The runtime to bundle, if any. A configured `java_path` or `no_java`
    /// means the system java is used and nothing is fetched.
    fn java_runtime(
        &self,
        dir: &Path,
        java_version: &str,
        http: &HttpClient,
    ) -> Result<Option<JavaRuntime>> {
        let version = java_version.trim();
        if self.options.no_java || self.config.java_path.is_some() || version.is_empty() {
            return Ok(None);
        }
        let launch = java_relative_path(version);
        let archive = if dir.join(&launch).is_file() {
            tracing::debug!("java runtime {} already present", version);
            None
        } else {
            Some(
                runtime_download(http, &self.endpoints.adoptium_api, version)
                    .with_context(|| format!("resolve java runtime {}", version))?,
            )
        };
        Ok(Some(JavaRuntime {
            version: version.to_string(),
            launch,
            archive,
        }))
    }

    fn threads(&self) -> usize {
        self.options.threads.filter(|n| *n > 0).unwrap_or_else(|| self.config.threads())
    }

    pub fn run(&self, provider: &dyn ModpackProvider) -> Result<InstallReport> {
        self.run_with_progress(provider, None)
    }

    /// Blocking; snapshots go to `progress_tx` while downloads run.
    pub fn run_with_progress(
        &self,
        provider: &dyn ModpackProvider,
        progress_tx: Option<&tokio::sync::mpsc::Sender<ProgressStats>>,
    ) -> Result<InstallReport> {
        let dir = self.options.install_dir.as_path();
        let opts = self.config.transfer_options();
        let http = HttpClient::from_options(&opts);

        let pack = provider.modpack()?;
        let version_id = match self.options.version_id {
            Some(id) => id,
            None => select_version(&pack.versions, self.options.latest)?.id,
        };
        let version = provider
            .version(version_id)
            .with_context(|| format!("fetch {} version {}", pack.name, version_id))?;
        tracing::info!(
            pack = %pack.name,
            version = %version.name,
            files = version.files.len(),
            "resolved version"
        );

        let next = InstalledManifest {
            pack_id: pack.id,
            pack_name: pack.name.clone(),
            version_name: version.name.clone(),
            version_id: version.id,
            targets: version.targets.clone(),
            file_set: version.files.clone(),
        };
        let existing = read_manifest(dir)?;
        let kind = classify(dir, existing.as_ref(), &next, self.options.force)?;
        let sync = match (&existing, kind.is_incremental()) {
            (Some(old), true) => prepare_sync(&old.file_set, &next.file_set),
            _ => SyncPlan::full(&next.file_set),
        };
        tracing::info!(
            %kind,
            download = sync.downloads.len(),
            prune = sync.diff.to_prune().count(),
            unchanged = sync.unchanged(),
            "sync planned"
        );

        let loader = if self.options.skip_modloader {
            None
        } else {
            Some(ModLoader::from_targets(&version.targets)?)
        };
        let loader_files = match &loader {
            Some(l) => loader_downloads(l.downloads(&http, &self.endpoints)?, &next),
            None => Vec::new(),
        };

        let runtime = self.java_runtime(dir, &version.targets.java_version, &http)?;
        let runtime_archive = runtime.as_ref().and_then(|r| r.archive.clone());

        std::fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
        let pruned = prune(dir, sync.diff.to_prune())?;
        let tasks = build_tasks(
            dir,
            sync.downloads.iter().chain(loader_files.iter()).chain(runtime_archive.iter()),
        )?;
        let downloads =
            coordinator::run(tasks, self.threads(), &opts, &self.progress, progress_tx)?;
        tracing::info!(
            files = downloads.files,
            bytes = downloads.bytes,
            mirror_fallbacks = downloads.mirror_fallbacks,
            "downloads complete"
        );

        if let (Some(rt), Some(archive)) = (&runtime, &runtime_archive) {
            let home = dir.join(RUNTIME_DIR).join(&rt.version);
            extract_runtime(&destination_path(dir, archive)?, &home)?;
        }

        if let Some(l) = &loader {
            let (java, launch_java) = match &runtime {
                Some(rt) => (dir.join(&rt.launch), rt.launch.clone()),
                None => (self.config.java(), self.config.java()),
            };
            let ctx = InstallContext {
                install_dir: dir,
                java: &java,
                launch_java: &launch_java,
                memory: version.memory,
            };
            l.install(&ctx, &loader_files)?;
        }

        let mut repaired = 0;
        if self.options.validate {
            let invalid = validate_install(dir, &next)?;
            if !invalid.is_empty() {
                for i in &invalid {
                    tracing::warn!("{}", i);
                }
                repair(dir, &invalid, self.threads(), &opts, &self.progress, progress_tx)?;
                repaired = invalid.len();
            }
        }

        write_manifest(dir, &next)?;
        Ok(InstallReport {
            kind,
            pack_name: next.pack_name,
            version_name: next.version_name,
            version_id: next.version_id,
            downloads,
            pruned,
            unchanged: sync.diff.unchanged.len(),
            repaired,
            loader: loader.as_ref().map(ModLoader::name),
            java: runtime.map(|rt| rt.launch),
        })
    }
}

/// Loader artifacts, minus any the pack itself ships at the same path.
fn loader_downloads(files: Vec<FileEntry>, next: &InstalledManifest) -> Vec<FileEntry> {
    let shipped: HashSet<FileKey> = next.file_set.iter().map(FileEntry::key).collect();
    files
        .into_iter()
        .filter(|f| {
            let shipped = shipped.contains(&f.key());
            if shipped {
                tracing::debug!("pack ships {}; not fetching loader copy", f.display_path());
            }
            !shipped
        })
        .collect()
}

/// Outcome of checking an install dir against its manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    pub checked: usize,
    pub invalid: Vec<Invalid>,
    pub repaired: Option<DownloadSummary>,
}

/// Validate an existing install; with `fix`, re-download what is bad.
pub fn verify_install(
    install_dir: &std::path::Path,
    config: &InstallerConfig,
    fix: bool,
    progress: &Progress,
    progress_tx: Option<&tokio::sync::mpsc::Sender<ProgressStats>>,
) -> Result<VerifyReport> {
    let manifest = read_manifest(install_dir)?
        .with_context(|| format!("no manifest in {}; nothing to verify", install_dir.display()))?;
    let checked = manifest
        .file_set
        .iter()
        .filter(|e| !e.content_hash.trim().is_empty())
        .count();
    let invalid = validate_install(install_dir, &manifest)?;
    let repaired = if fix && !invalid.is_empty() {
        let opts = config.transfer_options();
        Some(repair(install_dir, &invalid, config.threads(), &opts, progress, progress_tx)?)
    } else {
        None
    };
    Ok(VerifyReport {
        checked,
        invalid,
        repaired,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::HashAlgorithm;
    use crate::manifest::FileSet;

    #[test]
    fn loader_copy_skipped_when_pack_ships_it() {
        let jar = FileEntry::new("server.jar", "", "http://loader/server.jar");
        let patch = FileEntry::new("log4j2.xml", ".patches", "http://loader/log4j2.xml");
        let next = InstalledManifest {
            file_set: FileSet::from_entries(vec![
                FileEntry::new("server.jar", "./", "http://pack/server.jar").with_hash(HashAlgorithm::Sha1, "ab")
            ]),
            ..Default::default()
        };
        let kept = loader_downloads(vec![jar, patch.clone()], &next);
        assert_eq!(kept, vec![patch]);
    }

    #[test]
    fn loader_patch_matches_pack_copy_spelled_differently() {
        let dir = tempfile::tempdir().unwrap();
        let patch = FileEntry::new("log4j2.xml", ".patches", "http://loader/log4j2.xml");
        let pack_copy = FileEntry::new("log4j2.xml", "./.patches/", "http://pack/log4j2.xml");
        let next = InstalledManifest {
            file_set: FileSet::from_entries(vec![pack_copy.clone()]),
            ..Default::default()
        };

        let kept = loader_downloads(vec![patch], &next);
        assert!(kept.is_empty());

        let mut entries = next.file_set.into_entries();
        entries.extend(kept);
        let tasks = build_tasks(dir.path(), &entries).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].entry, pack_copy);
    }

    #[test]
    fn verify_without_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify_install(dir.path(), &InstallerConfig::default(), false, &Progress::new(), None)
            .unwrap_err();
        assert!(err.to_string().contains("no manifest"));
    }
}

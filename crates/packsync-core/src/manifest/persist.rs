//! Read and write `.manifest.json` inside an install directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::InstalledManifest;

/// File name of the installed manifest, relative to the install dir.
pub const MANIFEST_NAME: &str = ".manifest.json";

pub fn manifest_path(install_dir: &Path) -> PathBuf {
    install_dir.join(MANIFEST_NAME)
}

/// Load the manifest. Returns `None` when the directory has none (fresh
/// install, or a directory this tool did not create).
pub fn read_manifest(install_dir: &Path) -> Result<Option<InstalledManifest>> {
    let path = manifest_path(install_dir);
    if !path.exists() {
        return Ok(None);
    }
    read_manifest_file(&path).map(Some)
}

/// Load a manifest from an explicit file path.
pub fn read_manifest_file(path: &Path) -> Result<InstalledManifest> {
    let bytes = std::fs::read(path).with_context(|| format!("read manifest: {}", path.display()))?;
    let manifest: InstalledManifest = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse manifest: {}", path.display()))?;
    tracing::debug!(
        pack = manifest.pack_id,
        version = manifest.version_id,
        files = manifest.file_set.len(),
        "read manifest from {}",
        path.display()
    );
    Ok(manifest)
}

/// Write the manifest (pretty JSON). Goes through a temp file and rename so a
/// crash never leaves a truncated manifest behind.
pub fn write_manifest(install_dir: &Path, manifest: &InstalledManifest) -> Result<()> {
    std::fs::create_dir_all(install_dir)
        .with_context(|| format!("create dir: {}", install_dir.display()))?;
    let path = manifest_path(install_dir);
    let tmp = install_dir.join(format!("{}.tmp", MANIFEST_NAME));
    let json = serde_json::to_string_pretty(manifest).context("serialize manifest")?;
    std::fs::write(&tmp, json).with_context(|| format!("write manifest: {}", tmp.display()))?;
    std::fs::rename(&tmp, &path)
        .with_context(|| format!("rename {} to {}", tmp.display(), path.display()))?;
    tracing::info!("wrote manifest {}", path.display());
    Ok(())
}

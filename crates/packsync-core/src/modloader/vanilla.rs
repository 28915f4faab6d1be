//! Vanilla server jar via Mojang's version manifest.

use anyhow::{Context, Result};
use serde::Deserialize;

use super::LoaderEndpoints;
use crate::checksum::HashAlgorithm;
use crate::http::HttpClient;
use crate::manifest::FileEntry;

#[derive(Debug, Deserialize)]
struct VersionManifest {
    versions: Vec<ManifestVersion>,
}

#[derive(Debug, Deserialize)]
struct ManifestVersion {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct VersionJson {
    downloads: Downloads,
}

#[derive(Debug, Deserialize)]
struct Downloads {
    server: Option<Download>,
}

#[derive(Debug, Deserialize)]
struct Download {
    sha1: String,
    url: String,
}

pub(super) fn server_jar_name(mc_version: &str) -> String {
    format!("minecraft_server.{}.jar", mc_version)
}

/// The official server jar for `mc_version`, checked against Mojang's SHA-1.
pub(super) fn server_jar(
    http: &HttpClient,
    endpoints: &LoaderEndpoints,
    mc_version: &str,
) -> Result<FileEntry> {
    let manifest: VersionManifest = http.get_json(&endpoints.mojang_manifest)?;
    let version_url = find_version(&manifest, mc_version)
        .with_context(|| {
            format!("minecraft version {} not found in version manifest", mc_version)
        })?;
    let version: VersionJson = http.get_json(version_url)?;
    server_entry(version, mc_version)
}

fn find_version<'a>(manifest: &'a VersionManifest, mc_version: &str) -> Option<&'a str> {
    manifest
        .versions
        .iter()
        .find(|v| v.id == mc_version)
        .map(|v| v.url.as_str())
}

fn server_entry(version: VersionJson, mc_version: &str) -> Result<FileEntry> {
    let server = version
        .downloads
        .server
        .with_context(|| format!("minecraft {} has no server download", mc_version))?;
    Ok(FileEntry::new(server_jar_name(mc_version), "", server.url)
        .with_hash(HashAlgorithm::Sha1, server.sha1))
}

//! Feed The Beast modpack API.

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{Memory, Modpack, ModpackProvider, ModpackVersion, VersionSummary};
use crate::checksum::HashAlgorithm;
use crate::http::HttpClient;
use crate::manifest::{FileEntry, FileSet, ModLoaderTarget, ModpackTargets};

pub const FTB_API: &str = "https://api.feed-the-beast.com/v1/modpacks";

pub struct FtbProvider {
    base: String,
    pack_id: u64,
    http: HttpClient,
}

impl FtbProvider {
    pub fn new(pack_id: u64, api_key: &str, http: HttpClient) -> Self {
        Self::with_base_url(FTB_API, pack_id, api_key, http)
    }

    /// Provider against another API root (mirrors, tests).
    pub fn with_base_url(api_root: &str, pack_id: u64, api_key: &str, http: HttpClient) -> Self {
        let key = if api_key.trim().is_empty() { "public" } else { api_key.trim() };
        Self {
            base: format!("{}/{}", api_root.trim_end_matches('/'), key),
            pack_id,
            http,
        }
    }

    fn modpack_url(&self) -> String {
        format!("{}/modpack/{}", self.base, self.pack_id)
    }

    fn version_url(&self, version_id: u64) -> String {
        format!("{}/modpack/{}/{}", self.base, self.pack_id, version_id)
    }
}

impl ModpackProvider for FtbProvider {
    fn modpack(&self) -> Result<Modpack> {
        let url = self.modpack_url();
        tracing::debug!("fetching modpack from {}", url);
        let body = self.http.get_bytes(&url)?;
        parse_modpack(&body).with_context(|| format!("modpack {}", self.pack_id))
    }

    fn version(&self, version_id: u64) -> Result<ModpackVersion> {
        let url = self.version_url(version_id);
        tracing::debug!("fetching version from {}", url);
        let body = self.http.get_bytes(&url)?;
        parse_version(&body)
            .with_context(|| format!("modpack {} version {}", self.pack_id, version_id))
    }
}

#[derive(Debug, Deserialize)]
struct ApiModpack {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    versions: Vec<ApiVersionRef>,
}

#[derive(Debug, Deserialize)]
struct ApiVersionRef {
    id: u64,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ApiVersion {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    files: Vec<ApiFile>,
    #[serde(default)]
    targets: Vec<ApiTarget>,
    #[serde(default)]
    specs: ApiSpecs,
}

#[derive(Debug, Deserialize)]
struct ApiFile {
    name: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    sha1: String,
    #[serde(default)]
    clientonly: bool,
    #[serde(default)]
    mirrors: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ApiTarget {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSpecs {
    #[serde(default)]
    minimum: u32,
    #[serde(default)]
    recommended: u32,
}

fn check_status(status: &str, message: &str) -> Result<()> {
    if status != "success" {
        anyhow::bail!("unsuccessful response: {} {}", status, message);
    }
    Ok(())
}

fn parse_modpack(body: &[u8]) -> Result<Modpack> {
    let raw: ApiModpack = serde_json::from_slice(body).context("decode modpack")?;
    check_status(&raw.status, &raw.message)?;
    let mut versions: Vec<VersionSummary> = raw
        .versions
        .into_iter()
        .map(|v| VersionSummary {
            id: v.id,
            kind: v.kind.to_ascii_lowercase(),
        })
        .collect();
    versions.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(Modpack {
        id: raw.id,
        name: raw.name,
        versions,
    })
}

fn parse_version(body: &[u8]) -> Result<ModpackVersion> {
    let raw: ApiVersion = serde_json::from_slice(body).context("decode version")?;
    check_status(&raw.status, &raw.message)?;
    Ok(ModpackVersion {
        id: raw.id,
        name: raw.name,
        targets: parse_targets(&raw.targets),
        memory: Memory {
            minimum: raw.specs.minimum,
            recommended: raw.specs.recommended,
        },
        files: server_files(raw.files),
    })
}

fn parse_targets(targets: &[ApiTarget]) -> ModpackTargets {
    let mut out = ModpackTargets::default();
    for t in targets {
        match (t.kind.as_str(), t.name.as_str()) {
            ("modloader", _) => {
                out.mod_loader = ModLoaderTarget {
                    name: t.name.clone(),
                    version: t.version.clone(),
                }
            }
            ("game", "minecraft") => out.mc_version = t.version.clone(),
            ("runtime", "java") => out.java_version = t.version.clone(),
            _ => {}
        }
    }
    out
}

/// Drop client-only files; the API publishes SHA-1 for everything else.
fn server_files(files: Vec<ApiFile>) -> FileSet {
    files
        .into_iter()
        .filter(|f| !f.clientonly)
        .map(|f| {
            let mut entry =
                FileEntry::new(f.name, f.path, f.url).with_mirrors(f.mirrors.unwrap_or_default());
            if !f.sha1.trim().is_empty() {
                entry = entry.with_hash(HashAlgorithm::Sha1, f.sha1);
            }
            entry
        })
        .collect()
}

//! Modpack catalogs: where a pack's versions and file listings come from.

mod ftb;

pub use ftb::{FtbProvider, FTB_API};

use anyhow::Result;

use crate::http::HttpClient;
use crate::manifest::{FileSet, ModpackTargets};

/// Pack metadata with its version list, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modpack {
    pub id: u64,
    pub name: String,
    pub versions: Vec<VersionSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSummary {
    pub id: u64,
    /// Release channel, lowercase: `release`, `beta`, `alpha`.
    pub kind: String,
}

/// Server memory hints in MiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Memory {
    pub minimum: u32,
    pub recommended: u32,
}

/// One installable version: files plus the game/loader it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModpackVersion {
    pub id: u64,
    pub name: String,
    pub files: FileSet,
    pub targets: ModpackTargets,
    pub memory: Memory,
}

pub trait ModpackProvider: Send + Sync {
    fn modpack(&self) -> Result<Modpack>;
    fn version(&self, version_id: u64) -> Result<ModpackVersion>;
}

/// Pick the version to install when none was given: the newest `release`,
/// or the newest of any channel when `latest` is set.
pub fn select_version(versions: &[VersionSummary], latest: bool) -> Result<&VersionSummary> {
    let found = if latest {
        versions.first()
    } else {
        versions.iter().find(|v| v.kind == "release")
    };
    match found {
        Some(v) => Ok(v),
        None if latest => anyhow::bail!("pack has no versions; pass --version explicitly"),
        None => anyhow::bail!("no stable release found; rerun with --latest or pass --version"),
    }
}

/// Provider for a `--provider` tag.
pub fn provider_for(
    tag: &str,
    pack_id: u64,
    api_key: &str,
    http: HttpClient,
) -> Result<Box<dyn ModpackProvider>> {
    match tag.trim().to_ascii_lowercase().as_str() {
        "ftb" => Ok(Box::new(FtbProvider::new(pack_id, api_key, http))),
        other => anyhow::bail!("unknown provider '{}' (supported: ftb)", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(id: u64, kind: &str) -> VersionSummary {
        VersionSummary { id, kind: kind.into() }
    }

    #[test]
    fn select_newest_release_by_default() {
        let list = vec![v(30, "beta"), v(20, "release"), v(10, "release")];
        assert_eq!(select_version(&list, false).unwrap().id, 20);
        assert_eq!(select_version(&list, true).unwrap().id, 30);
    }

    #[test]
    fn select_without_release_fails_unless_latest() {
        let list = vec![v(3, "alpha")];
        assert!(select_version(&list, false).is_err());
        assert_eq!(select_version(&list, true).unwrap().id, 3);
        assert!(select_version(&[], true).is_err());
    }

    #[test]
    fn provider_tags() {
        assert!(provider_for("ftb", 1, "public", HttpClient::default()).is_ok());
        assert!(provider_for("FTB", 1, "public", HttpClient::default()).is_ok());
        let err = provider_for("curseforge", 1, "public", HttpClient::default()).err().unwrap();
        assert!(err.to_string().contains("curseforge"));
    }
}

//! Game loaders: which extra artifacts a server needs and how to run their installers.
//!
//! The loader is picked once from the version's targets. Artifacts returned by
//! [`ModLoader::downloads`] go through the same coordinator as pack files and land
//! in the install dir root; [`ModLoader::install`] then runs the installer there.

mod fabric;
mod forge;
mod neoforge;
mod script;
mod vanilla;

pub use script::{add_nogui, ensure_xmx, log4j_mitigation, use_java, write_start_script, Log4jFix};

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::http::HttpClient;
use crate::manifest::{FileEntry, ModpackTargets};
use crate::provider::Memory;
use crate::runtime::ADOPTIUM_API;

pub const FORGE_MAVEN: &str = "https://maven.minecraftforge.net";
pub const NEOFORGE_MAVEN: &str = "https://maven.neoforged.net";
pub const FABRIC_META: &str = "https://meta.fabricmc.net";
pub const MOJANG_VERSION_MANIFEST: &str =
    "https://launchermeta.mojang.com/mc/game/version_manifest.json";

/// Where loader metadata, installers and the Java runtime are fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderEndpoints {
    pub forge_maven: String,
    pub neoforge_maven: String,
    pub fabric_meta: String,
    pub mojang_manifest: String,
    pub adoptium_api: String,
}

impl Default for LoaderEndpoints {
    fn default() -> Self {
        Self {
            forge_maven: FORGE_MAVEN.to_string(),
            neoforge_maven: NEOFORGE_MAVEN.to_string(),
            fabric_meta: FABRIC_META.to_string(),
            mojang_manifest: MOJANG_VERSION_MANIFEST.to_string(),
            adoptium_api: ADOPTIUM_API.to_string(),
        }
    }
}

/// Installer process exited unsuccessfully.
#[derive(Debug)]
pub struct InstallerFailed {
    pub loader: &'static str,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl fmt::Display for InstallerFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} installer failed with exit code {}", self.loader, code),
            None => write!(f, "{} installer was terminated by a signal", self.loader),
        }
    }
}

impl std::error::Error for InstallerFailed {}

/// Inputs for running an installer inside the install dir.
#[derive(Debug, Clone)]
pub struct InstallContext<'a> {
    pub install_dir: &'a Path,
    /// Executable that runs the installer jars.
    pub java: &'a Path,
    /// What start scripts invoke: `java` from PATH, or the bundled runtime
    /// relative to the install dir.
    pub launch_java: &'a Path,
    pub memory: Memory,
}

impl InstallContext<'_> {
    fn bundled_java(&self) -> Option<&Path> {
        (self.launch_java != Path::new("java")).then_some(self.launch_java)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModLoader {
    Vanilla { mc_version: String },
    Forge { mc_version: String, version: String },
    NeoForge { mc_version: String, version: String },
    Fabric { mc_version: String, version: String },
}

impl ModLoader {
    pub fn from_targets(targets: &ModpackTargets) -> Result<Self> {
        let mc_version = targets.mc_version.trim().to_string();
        let version = targets.mod_loader.version.trim().to_string();
        let name = targets.mod_loader.name.trim().to_ascii_lowercase();
        if mc_version.is_empty() {
            anyhow::bail!("version does not name a minecraft version");
        }
        let loader = match name.as_str() {
            "" | "vanilla" => ModLoader::Vanilla { mc_version },
            "forge" => ModLoader::Forge { mc_version, version },
            "neoforge" => ModLoader::NeoForge { mc_version, version },
            "fabric" => ModLoader::Fabric { mc_version, version },
            other => anyhow::bail!("mod loader '{}' not recognised", other),
        };
        if let ModLoader::Forge { version, .. }
        | ModLoader::NeoForge { version, .. }
        | ModLoader::Fabric { version, .. } = &loader
        {
            if version.is_empty() {
                anyhow::bail!("{} target has no loader version", loader.name());
            }
        }
        Ok(loader)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModLoader::Vanilla { .. } => "vanilla",
            ModLoader::Forge { .. } => "forge",
            ModLoader::NeoForge { .. } => "neoforge",
            ModLoader::Fabric { .. } => "fabric",
        }
    }

    pub fn mc_version(&self) -> &str {
        match self {
            ModLoader::Vanilla { mc_version }
            | ModLoader::Forge { mc_version, .. }
            | ModLoader::NeoForge { mc_version, .. }
            | ModLoader::Fabric { mc_version, .. } => mc_version,
        }
    }

    /// Artifacts to fetch alongside the pack files (installer jars, server jar, patches).
    pub fn downloads(
        &self,
        http: &HttpClient,
        endpoints: &LoaderEndpoints,
    ) -> Result<Vec<FileEntry>> {
        let files = match self {
            ModLoader::Vanilla { mc_version } => {
                vec![vanilla::server_jar(http, endpoints, mc_version)?]
            }
            ModLoader::Forge { mc_version, version } => {
                forge::downloads(http, endpoints, mc_version, version)?
            }
            ModLoader::NeoForge { mc_version, version } => {
                vec![neoforge::installer(endpoints, mc_version, version)]
            }
            ModLoader::Fabric { mc_version, .. } => fabric::installer(http, endpoints, mc_version)?,
        };
        tracing::debug!(loader = self.name(), files = files.len(), "loader downloads resolved");
        Ok(files)
    }

    /// Run the installer against artifacts previously returned by [`downloads`](Self::downloads)
    /// and patch the generated launch files.
    pub fn install(&self, ctx: &InstallContext<'_>, artifacts: &[FileEntry]) -> Result<()> {
        tracing::info!(
            loader = self.name(),
            "running loader installer in {}",
            ctx.install_dir.display()
        );
        match self {
            ModLoader::Vanilla { .. } => Ok(()),
            ModLoader::Forge { mc_version, .. } => forge::install(ctx, mc_version, artifacts),
            ModLoader::NeoForge { .. } => neoforge::install(ctx, artifacts),
            ModLoader::Fabric { mc_version, version } => {
                fabric::install(ctx, mc_version, version, artifacts)
            }
        }
    }
}

/// Artifact whose name ends with `suffix`, as a path under the install dir.
fn artifact_path(
    ctx: &InstallContext<'_>,
    artifacts: &[FileEntry],
    suffix: &str,
) -> Result<(PathBuf, String)> {
    let entry = artifacts
        .iter()
        .find(|e| e.name.ends_with(suffix))
        .with_context(|| format!("no *{} artifact was downloaded", suffix))?;
    let path = crate::manifest::destination_path(ctx.install_dir, entry)?;
    if !path.is_file() {
        anyhow::bail!("installer {} does not exist", path.display());
    }
    Ok((path, entry.name.clone()))
}

/// Run `java -jar <jar> <args..>` in the install dir and require a zero exit.
fn run_installer(
    ctx: &InstallContext<'_>,
    loader: &'static str,
    jar: &str,
    args: &[&str],
) -> Result<()> {
    tracing::debug!(loader, java = %ctx.java.display(), jar, ?args, "spawning installer");
    let status = Command::new(ctx.java)
        .arg("-jar")
        .arg(jar)
        .args(args)
        .current_dir(ctx.install_dir)
        .status()
        .with_context(|| {
            format!("could not start {} installer with {}", loader, ctx.java.display())
        })?;
    if !status.success() {
        return Err(InstallerFailed {
            loader,
            code: status.code(),
        }
        .into());
    }
    tracing::info!(loader, "installer finished");
    Ok(())
}

/// `nogui` for the installer-generated run script, plus the bundled runtime
/// when there is one.
fn patch_run_script(ctx: &InstallContext<'_>, script: &Path) -> Result<()> {
    script::add_nogui(script)?;
    if let Some(java) = ctx.bundled_java() {
        script::use_java(script, java)?;
    }
    Ok(())
}

fn remove_installer(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("could not remove {}: {}", path.display(), e);
    }
}

/// Numeric dotted-version comparison: `1.20.2 >= 1.20`. Non-numeric parts
/// (`-pre1`, snapshots) are cut at the first non-digit.
pub fn version_at_least(version: &str, min: &str) -> bool {
    fn parts(v: &str) -> Vec<u64> {
        v.split('.')
            .map(|p| {
                let digits: String = p.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().unwrap_or(0)
            })
            .collect()
    }
    let (a, b) = (parts(version), parts(min));
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        if x != y {
            return x > y;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ModLoaderTarget;

    fn targets(name: &str, version: &str, mc: &str) -> ModpackTargets {
        ModpackTargets {
            mod_loader: ModLoaderTarget {
                name: name.into(),
                version: version.into(),
            },
            java_version: "17".into(),
            mc_version: mc.into(),
        }
    }

    #[test]
    fn selects_loader_from_targets() {
        assert_eq!(
            ModLoader::from_targets(&targets("NeoForge", "20.4.80", "1.20.4")).unwrap(),
            ModLoader::NeoForge {
                mc_version: "1.20.4".into(),
                version: "20.4.80".into()
            }
        );
        assert_eq!(ModLoader::from_targets(&targets("forge", "47.2.0", "1.20.1")).unwrap().name(), "forge");
        assert_eq!(ModLoader::from_targets(&targets("fabric", "0.15.7", "1.20.1")).unwrap().name(), "fabric");
        assert_eq!(ModLoader::from_targets(&targets("", "", "1.20.1")).unwrap().name(), "vanilla");
    }

    #[test]
    fn rejects_unknown_or_incomplete_targets() {
        assert!(ModLoader::from_targets(&targets("quilt", "1", "1.20.1")).is_err());
        assert!(ModLoader::from_targets(&targets("forge", "", "1.20.1")).is_err());
        assert!(ModLoader::from_targets(&targets("forge", "1", "")).is_err());
    }

    #[test]
    fn version_comparison() {
        assert!(version_at_least("1.20.2", "1.20.2"));
        assert!(version_at_least("1.20.4", "1.20.2"));
        assert!(version_at_least("1.21", "1.20.2"));
        assert!(!version_at_least("1.20.1", "1.20.2"));
        assert!(!version_at_least("1.20", "1.20.2"));
        assert!(version_at_least("1.7.10", "1.7"));
        assert!(!version_at_least("1.16.5", "1.17"));
    }

    #[test]
    fn installer_failure_message_names_loader_and_code() {
        let e = InstallerFailed {
            loader: "forge",
            code: Some(3),
        };
        assert_eq!(e.to_string(), "forge installer failed with exit code 3");
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_installer_failed() {
        let dir = tempfile::tempdir().unwrap();
        // `false` ignores its arguments and exits 1.
        let java = PathBuf::from("false");
        let ctx = InstallContext {
            install_dir: dir.path(),
            java: &java,
            launch_java: Path::new("java"),
            memory: Memory::default(),
        };
        let err = run_installer(&ctx, "neoforge", "x.jar", &["--installServer"]).unwrap_err();
        let failed = err.downcast_ref::<InstallerFailed>().unwrap();
        assert_eq!(failed.loader, "neoforge");
        assert_eq!(failed.code, Some(1));
    }
}

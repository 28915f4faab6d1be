//! Fabric: the installer jar from Fabric's meta service, run in server mode.

use anyhow::{Context, Result};
use serde::Deserialize;

use super::script::{log4j_mitigation, write_start_script};
use super::{artifact_path, remove_installer, run_installer, InstallContext, LoaderEndpoints};
use crate::http::HttpClient;
use crate::manifest::FileEntry;

const LAUNCH_JAR: &str = "fabric-server-launch.jar";

#[derive(Debug, Clone, Deserialize)]
pub(super) struct InstallerVersion {
    pub url: String,
    pub version: String,
    #[serde(default)]
    pub stable: bool,
}

/// First stable installer, else the newest listed.
fn pick(list: &[InstallerVersion]) -> Option<&InstallerVersion> {
    list.iter().find(|v| v.stable).or_else(|| list.first())
}

fn installer_name(version: &str) -> String {
    format!("fabric-installer-{}.jar", version)
}

pub(super) fn installer(
    http: &HttpClient,
    endpoints: &LoaderEndpoints,
    mc: &str,
) -> Result<Vec<FileEntry>> {
    let url = format!("{}/v2/versions/installer", endpoints.fabric_meta.trim_end_matches('/'));
    let list: Vec<InstallerVersion> = http.get_json(&url)?;
    let chosen = pick(&list).context("fabric meta lists no installer versions")?;
    let mut files = vec![FileEntry::new(installer_name(&chosen.version), "", chosen.url.clone())];
    if let Some(patch) = log4j_mitigation(mc).patch {
        files.push(patch);
    }
    Ok(files)
}

pub(super) fn install(
    ctx: &InstallContext<'_>,
    mc: &str,
    loader_version: &str,
    artifacts: &[FileEntry],
) -> Result<()> {
    let (path, name) = artifact_path(ctx, artifacts, ".jar")?;
    run_installer(
        ctx,
        "fabric",
        &name,
        &["server", "-mcversion", mc, "-loader", loader_version, "-downloadMinecraft"],
    )?;
    remove_installer(&path);

    let mut jvm_args = Vec::new();
    if ctx.memory.recommended > 0 {
        jvm_args.push(format!("-Xmx{}M", ctx.memory.recommended));
    }
    jvm_args.extend(log4j_mitigation(mc).jvm_flag);
    write_start_script(ctx.install_dir, ctx.launch_java, &jvm_args, LAUNCH_JAR)?;
    Ok(())
}

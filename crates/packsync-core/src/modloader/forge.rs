//! Minecraft Forge. Three artifact layouts exist on the maven, tried in order:
//! the standard installer, the `<mc>-<ver>-<mc>` installer used by some 1.7/1.8
//! builds, and the pre-installer `universal.zip` that is merged into the vanilla jar.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;

use super::script::{
    ensure_xmx, log4j_mitigation, run_script_path, write_start_script, JVM_ARGS_FILE,
};
use super::{
    artifact_path, patch_run_script, remove_installer, run_installer, vanilla, version_at_least,
    InstallContext, LoaderEndpoints,
};
use crate::http::HttpClient;
use crate::manifest::FileEntry;

/// Candidate `(file name, url)` pairs, most common layout first.
pub(super) fn candidates(
    endpoints: &LoaderEndpoints,
    mc: &str,
    version: &str,
) -> Vec<(String, String)> {
    let base = format!(
        "{}/releases/net/minecraftforge/forge",
        endpoints.forge_maven.trim_end_matches('/')
    );
    let standard = format!("forge-{}-{}-installer.jar", mc, version);
    let legacy = format!("forge-{}-{}-{}-installer.jar", mc, version, mc);
    let universal = format!("forge-{}-{}-universal.zip", mc, version);
    vec![
        (standard.clone(), format!("{}/{}-{}/{}", base, mc, version, standard)),
        (legacy.clone(), format!("{}/{}-{}-{}/{}", base, mc, version, mc, legacy)),
        (universal.clone(), format!("{}/{}-{}/{}", base, mc, version, universal)),
    ]
}

pub(super) fn downloads(
    http: &HttpClient,
    endpoints: &LoaderEndpoints,
    mc: &str,
    version: &str,
) -> Result<Vec<FileEntry>> {
    let (name, url) = candidates(endpoints, mc, version)
        .into_iter()
        .find(|(_, url)| http.exists(url))
        .with_context(|| format!("can't find forge {} for minecraft {}", version, mc))?;
    tracing::debug!("forge artifact {}", url);

    let legacy_zip = name.ends_with(".zip");
    let mut files = vec![FileEntry::new(name, "", url)];
    if legacy_zip {
        files.push(vanilla::server_jar(http, endpoints, mc)?);
    }
    if let Some(patch) = log4j_mitigation(mc).patch {
        files.push(patch);
    }
    Ok(files)
}

pub(super) fn install(ctx: &InstallContext<'_>, mc: &str, artifacts: &[FileEntry]) -> Result<()> {
    if artifacts.iter().any(|a| a.name.ends_with("-installer.jar")) {
        let (path, name) = artifact_path(ctx, artifacts, "-installer.jar")?;
        run_installer(ctx, "forge", &name, &["--installServer"])?;
        remove_installer(&path);
    } else {
        let (zip_path, _) = artifact_path(ctx, artifacts, "-universal.zip")?;
        let jar = ctx.install_dir.join(vanilla::server_jar_name(mc));
        merge_universal(&zip_path, &jar)?;
        remove_installer(&zip_path);
    }
    patch_launch(ctx, mc)
}

fn patch_launch(ctx: &InstallContext<'_>, mc: &str) -> Result<()> {
    let fix = log4j_mitigation(mc);
    let args_file = ctx.install_dir.join(JVM_ARGS_FILE);
    if args_file.is_file() {
        ensure_xmx(&args_file, ctx.memory.recommended, fix.jvm_flag.as_deref())?;
    }
    let run_script = run_script_path(ctx.install_dir);
    if run_script.is_file() {
        patch_run_script(ctx, &run_script)?;
        return Ok(());
    }

    // Older installers leave only a server jar behind; launch it directly.
    let jar = server_jar_in(ctx.install_dir, mc)?
        .with_context(|| format!("no forge server jar found in {}", ctx.install_dir.display()))?;
    let mut jvm_args = Vec::new();
    if ctx.memory.recommended > 0 {
        jvm_args.push(format!("-Xmx{}M", ctx.memory.recommended));
    }
    jvm_args.extend(fix.jvm_flag);
    write_start_script(ctx.install_dir, ctx.launch_java, &jvm_args, &jar)?;
    Ok(())
}

/// The launchable jar: `forge-<mc>-<ver>[...].jar` after 1.5.1, the patched
/// vanilla jar before.
fn server_jar_in(dir: &Path, mc: &str) -> Result<Option<String>> {
    let installer_era = version_at_least(mc, "1.5.2");
    let mut names: Vec<String> = fs::read_dir(dir)
        .with_context(|| format!("read dir {}", dir.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names.into_iter().find(|n| {
        if installer_era {
            n.starts_with("forge-") && n.ends_with(".jar") && !n.contains("installer")
        } else {
            n.starts_with("minecraft_server.") && n.ends_with(".jar")
        }
    }))
}

/// Overlay the universal zip onto the vanilla server jar. Forge classes replace
/// vanilla ones; the vanilla signature (`META-INF/`) is dropped.
fn merge_universal(universal: &Path, server_jar: &Path) -> Result<()> {
    let file = File::open(universal).with_context(|| format!("open {}", universal.display()))?;
    let mut forge = zip::ZipArchive::new(file)
        .with_context(|| format!("read zip {}", universal.display()))?;
    let overridden: HashSet<String> = forge.file_names().map(str::to_string).collect();
    let file = File::open(server_jar).with_context(|| format!("open {}", server_jar.display()))?;
    let mut base = zip::ZipArchive::new(file)
        .with_context(|| format!("read jar {}", server_jar.display()))?;

    let tmp = server_jar.with_extension("jar.tmp");
    let file = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
    let mut out = zip::ZipWriter::new(file);
    for i in 0..base.len() {
        let entry = base.by_index_raw(i)?;
        if entry.name().starts_with("META-INF/") || overridden.contains(entry.name()) {
            continue;
        }
        out.raw_copy_file(entry)?;
    }
    for i in 0..forge.len() {
        out.raw_copy_file(forge.by_index_raw(i)?)?;
    }
    out.finish()?;
    fs::rename(&tmp, server_jar).with_context(|| format!("replace {}", server_jar.display()))?;
    tracing::info!("merged {} into {}", universal.display(), server_jar.display());
    Ok(())
}

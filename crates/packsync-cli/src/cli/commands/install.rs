//! `packsync install`: resolve a modpack version and sync it into a directory.

use anyhow::{Context, Result};
use packsync_core::config::InstallerConfig;
use packsync_core::coordinator::ProgressStats;
use packsync_core::http::HttpClient;
use packsync_core::install::{parse_installer_name, InstallOptions, Installer};
use packsync_core::provider::provider_for;
use std::path::{Path, PathBuf};

use super::print_progress;

#[derive(Debug, Clone)]
pub struct InstallArgs {
    pub pack: Option<u64>,
    pub version: Option<u64>,
    pub dir: PathBuf,
    pub threads: Option<usize>,
    pub provider: String,
    pub api_key: String,
    pub latest: bool,
    pub force: bool,
    pub validate: bool,
    pub skip_modloader: bool,
    pub no_java: bool,
}

/// Pack and version from flags, falling back to ids embedded in the
/// executable name. An explicit `--version` wins over the name.
pub fn resolve_ids(
    pack: Option<u64>,
    version: Option<u64>,
    argv0: Option<&str>,
) -> Result<(u64, Option<u64>)> {
    if let Some(pack) = pack {
        return Ok((pack, version));
    }
    let stem = argv0
        .and_then(|a| Path::new(a).file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let (pack, from_name) = parse_installer_name(stem).context("no --pack given")?;
    Ok((pack, version.or(from_name)))
}

pub async fn run_install(cfg: InstallerConfig, args: InstallArgs) -> Result<()> {
    let argv0 = std::env::args().next();
    let (pack_id, version_id) = resolve_ids(args.pack, args.version, argv0.as_deref())?;
    tracing::info!(
        pack = pack_id,
        version = ?version_id,
        dir = %args.dir.display(),
        "install requested"
    );

    let http = HttpClient::from_options(&cfg.transfer_options());
    let provider = provider_for(&args.provider, pack_id, &args.api_key, http)?;
    let options = InstallOptions {
        install_dir: args.dir,
        version_id,
        latest: args.latest,
        force: args.force,
        validate: args.validate,
        skip_modloader: args.skip_modloader,
        no_java: args.no_java,
        threads: args.threads,
    };
    let installer = Installer::new(cfg, options);

    let (progress_tx, progress_rx) = tokio::sync::mpsc::channel::<ProgressStats>(16);
    let printer = tokio::spawn(print_progress(progress_rx));
    let report = tokio::task::spawn_blocking(move || {
        installer.run_with_progress(provider.as_ref(), Some(&progress_tx))
    })
    .await??;
    let _ = printer.await;

    println!(
        "{} of {} {} ({}): {} file(s) downloaded, {} unchanged, {} removed",
        report.kind,
        report.pack_name,
        report.version_name,
        report.version_id,
        report.downloads.files,
        report.unchanged,
        report.pruned
    );
    if report.downloads.mirror_fallbacks > 0 {
        println!("{} file(s) were served by a mirror", report.downloads.mirror_fallbacks);
    }
    if report.repaired > 0 {
        println!("{} file(s) failed validation and were re-downloaded", report.repaired);
    }
    if let Some(loader) = report.loader {
        println!("mod loader: {}", loader);
    }
    if let Some(java) = &report.java {
        println!("java runtime: {}", java.display());
    }
    Ok(())
}

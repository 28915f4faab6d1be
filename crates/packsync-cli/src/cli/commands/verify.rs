//! `packsync verify`: re-hash an installation and optionally repair it.

use anyhow::Result;
use packsync_core::config::InstallerConfig;
use packsync_core::coordinator::{Progress, ProgressStats};
use packsync_core::install::verify_install;
use std::path::PathBuf;

use super::print_progress;

pub async fn run_verify(cfg: InstallerConfig, dir: PathBuf, repair: bool) -> Result<()> {
    let (progress_tx, progress_rx) = tokio::sync::mpsc::channel::<ProgressStats>(16);
    let printer = tokio::spawn(print_progress(progress_rx));
    let report = tokio::task::spawn_blocking(move || {
        verify_install(&dir, &cfg, repair, &Progress::new(), Some(&progress_tx))
    })
    .await??;
    let _ = printer.await;

    for invalid in &report.invalid {
        println!("{}", invalid);
    }
    match &report.repaired {
        Some(summary) => {
            println!("repaired {} of {} checked file(s)", summary.files, report.checked)
        }
        None if report.invalid.is_empty() => {
            println!("all {} checked file(s) are valid", report.checked)
        }
        None => anyhow::bail!(
            "{} of {} file(s) failed validation; rerun with --repair",
            report.invalid.len(),
            report.checked
        ),
    }
    Ok(())
}

//! CLI command handlers, one per file.

mod checksum;
mod diff;
mod install;
mod verify;

pub use checksum::run_checksum;
pub use diff::run_diff;
pub use install::{run_install, InstallArgs};
pub use verify::run_verify;

use packsync_core::coordinator::ProgressStats;
use std::time::Instant;

const PROGRESS_INTERVAL_MS: u128 = 500;

/// Print download progress until the sender side is dropped.
pub(crate) async fn print_progress(mut rx: tokio::sync::mpsc::Receiver<ProgressStats>) {
    let mut last_print: Option<Instant> = None;
    let mut printed = false;
    while let Some(stats) = rx.recv().await {
        let now = Instant::now();
        let due = last_print
            .map_or(true, |t| now.duration_since(t).as_millis() >= PROGRESS_INTERVAL_MS);
        if (due || stats.is_done()) && stats.total > 0 {
            let mib = stats.bytes_done as f64 / 1_048_576.0;
            let rate = if stats.elapsed_secs > 0.0 { mib / stats.elapsed_secs } else { 0.0 };
            println!(
                "  {} / {} files  {:.1} MiB ({:.1}%)  {:.2} MiB/s",
                stats.completed,
                stats.total,
                mib,
                stats.fraction() * 100.0,
                rate
            );
            last_print = Some(now);
            printed = true;
        }
    }
    if printed {
        println!();
    }
}

//! Bounded worker pool that runs a batch of transfers.
//!
//! `min(limit, tasks)` threads pull from a shared queue and report on a
//! channel. The first failure sets the abort flag and drains the queue:
//! in-flight transfers finish, nothing new starts, and that error is returned.

mod progress;

pub use progress::{Progress, ProgressStats};

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::TransferError;
use crate::transfer::{self, DownloadTask, TransferOptions, TransferOutcome};

/// Send a progress snapshot every N completed files.
pub const COALESCE_PROGRESS_EVERY: usize = 4;

/// Totals for a finished batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadSummary {
    pub files: usize,
    pub bytes: u64,
    /// Attempts across all files (1 per file when every primary URL works).
    pub attempts: u32,
    /// Files that were served by a mirror rather than their primary URL.
    pub mirror_fallbacks: usize,
    pub elapsed_secs: f64,
}

/// Download every task with at most `limit` transfers in flight.
///
/// Blocks until the batch is done. `Ok` only when every file was fetched and
/// verified; `limit == 0` is treated as 1.
pub fn run(
    tasks: Vec<DownloadTask>,
    limit: usize,
    opts: &TransferOptions,
    progress: &Progress,
    progress_tx: Option<&tokio::sync::mpsc::Sender<ProgressStats>>,
) -> Result<DownloadSummary, TransferError> {
    let opts = opts.clone();
    run_with(tasks, limit, progress, progress_tx, move |task| transfer::transfer(task, &opts))
}

/// [`run`] with a caller-supplied transfer function.
pub fn run_with<F>(
    tasks: Vec<DownloadTask>,
    limit: usize,
    progress: &Progress,
    progress_tx: Option<&tokio::sync::mpsc::Sender<ProgressStats>>,
    fetch: F,
) -> Result<DownloadSummary, TransferError>
where
    F: Fn(&DownloadTask) -> Result<TransferOutcome, TransferError> + Send + Sync + 'static,
{
    check_unique_destinations(&tasks)?;

    let count = tasks.len();
    progress.begin(count);
    let mut summary = DownloadSummary::default();
    if count == 0 {
        send_final(progress, progress_tx);
        return Ok(summary);
    }

    let primaries: Vec<String> = tasks.iter().map(|t| t.entry.primary_url.clone()).collect();
    let work: Arc<Mutex<VecDeque<(usize, DownloadTask)>>> =
        Arc::new(Mutex::new(tasks.into_iter().enumerate().collect()));
    let abort = Arc::new(AtomicBool::new(false));
    let fetch = Arc::new(fetch);
    let (tx, rx) = mpsc::channel();
    let num_workers = limit.max(1).min(count);
    tracing::debug!(files = count, workers = num_workers, "starting download batch");

    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        let abort = Arc::clone(&abort);
        let fetch = Arc::clone(&fetch);
        handles.push(std::thread::spawn(move || loop {
            if abort.load(Ordering::Relaxed) {
                break;
            }
            let (index, task) = match lock(&work).pop_front() {
                Some(next) => next,
                None => break,
            };
            let res = fetch(&task);
            if tx.send((index, res)).is_err() {
                break;
            }
        }));
    }
    drop(tx);

    let mut first_error: Option<TransferError> = None;
    let mut completed_since_send = 0usize;
    let mut to_receive = count;
    while to_receive > 0 {
        let (index, res) = match rx.recv() {
            Ok(pair) => pair,
            Err(_) => {
                first_error.get_or_insert(TransferError::WorkerPanicked);
                break;
            }
        };
        to_receive -= 1;
        match res {
            Ok(outcome) => {
                progress.file_done(outcome.bytes);
                summary.files += 1;
                summary.bytes += outcome.bytes;
                summary.attempts += outcome.attempts;
                if outcome.url != primaries[index] {
                    summary.mirror_fallbacks += 1;
                }
                completed_since_send += 1;
                if let Some(ptx) = progress_tx {
                    if completed_since_send >= COALESCE_PROGRESS_EVERY {
                        let _ = ptx.try_send(progress.snapshot());
                        completed_since_send = 0;
                    }
                }
            }
            Err(e) => {
                if first_error.is_none() {
                    tracing::error!("download failed, aborting batch: {}", e);
                    abort.store(true, Ordering::Relaxed);
                    let drained = {
                        let mut q = lock(&work);
                        let n = q.len();
                        q.clear();
                        n
                    };
                    to_receive = to_receive.saturating_sub(drained);
                    first_error = Some(e);
                } else {
                    tracing::warn!("further download failure after abort: {}", e);
                }
            }
        }
    }

    for h in handles {
        if h.join().is_err() {
            first_error.get_or_insert(TransferError::WorkerPanicked);
        }
    }
    if let Some(e) = first_error {
        if let Some(ptx) = progress_tx {
            let _ = ptx.try_send(progress.snapshot());
        }
        return Err(e);
    }

    summary.elapsed_secs = progress.snapshot().elapsed_secs;
    send_final(progress, progress_tx);
    tracing::info!(
        files = summary.files,
        bytes = summary.bytes,
        mirror_fallbacks = summary.mirror_fallbacks,
        "download batch complete"
    );
    Ok(summary)
}

fn check_unique_destinations(tasks: &[DownloadTask]) -> Result<(), TransferError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for t in tasks {
        if !seen.insert(t.destination.as_path()) {
            return Err(TransferError::DuplicateDestination(t.destination.clone()));
        }
    }
    Ok(())
}

/// The completion snapshot must reach the listener even when the channel is
/// momentarily full, so fall back to a blocking send.
fn send_final(progress: &Progress, progress_tx: Option<&tokio::sync::mpsc::Sender<ProgressStats>>) {
    use tokio::sync::mpsc::error::TrySendError;

    let Some(ptx) = progress_tx else { return };
    if let Err(TrySendError::Full(stats)) = ptx.try_send(progress.snapshot()) {
        let _ = ptx.blocking_send(stats);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::FileEntry;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn tasks(n: usize) -> Vec<DownloadTask> {
        (0..n)
            .map(|i| {
                let name = format!("f{}.jar", i);
                DownloadTask::new(
                    FileEntry::new(name.clone(), "mods", format!("http://primary/{}", name)),
                    PathBuf::from(format!("/tmp/never-written/{}", name)),
                )
            })
            .collect()
    }

    fn ok(task: &DownloadTask) -> Result<TransferOutcome, TransferError> {
        Ok(TransferOutcome {
            url: task.entry.primary_url.clone(),
            bytes: 10,
            attempts: 1,
        })
    }

    #[test]
    fn empty_batch_succeeds_with_final_snapshot() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let progress = Progress::new();
        let summary = run_with(Vec::new(), 4, &progress, Some(&tx), ok).unwrap();
        assert_eq!(summary.files, 0);
        let last = rx.try_recv().unwrap();
        assert_eq!((last.completed, last.total), (0, 0));
    }

    #[test]
    fn all_tasks_complete_and_final_snapshot_is_full() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let progress = Progress::new();
        let summary = run_with(tasks(10), 3, &progress, Some(&tx), ok).unwrap();
        assert_eq!(summary.files, 10);
        assert_eq!(summary.bytes, 100);
        assert_eq!(summary.attempts, 10);
        assert_eq!(summary.mirror_fallbacks, 0);
        let mut last = None;
        while let Ok(s) = rx.try_recv() {
            last = Some(s);
        }
        let last = last.unwrap();
        assert_eq!((last.completed, last.total), (10, 10));
        assert_eq!(progress.completed(), 10);
    }

    #[test]
    fn never_exceeds_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let progress = Progress::new();
        run_with(tasks(12), 2, &progress, None, move |t| {
            let now = f.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            f.fetch_sub(1, Ordering::SeqCst);
            ok(t)
        })
        .unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn zero_limit_runs_sequentially() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let summary = run_with(tasks(5), 0, &Progress::new(), None, move |t| {
            let now = f.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(2));
            f.fetch_sub(1, Ordering::SeqCst);
            ok(t)
        })
        .unwrap();
        assert_eq!(summary.files, 5);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn first_failure_stops_dispatch() {
        let started = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&started);
        let err = run_with(tasks(50), 1, &Progress::new(), None, move |t| {
            let n = s.fetch_add(1, Ordering::SeqCst);
            if t.entry.name == "f2.jar" {
                return Err(TransferError::ExhaustedMirrors {
                    file: t.entry.display_path(),
                    attempted_urls: vec![t.entry.primary_url.clone()],
                    last_error: "HTTP 404".into(),
                });
            }
            if n > 2 {
                std::thread::sleep(Duration::from_millis(50));
            }
            ok(t)
        })
        .unwrap_err();
        assert_eq!(err.failed_file(), Some("mods/f2.jar"));
        // The single worker may have picked up one more task before the abort landed.
        assert!(started.load(Ordering::SeqCst) <= 4);
    }

    #[test]
    fn mirror_use_is_counted() {
        let summary = run_with(tasks(3), 2, &Progress::new(), None, |t| {
            Ok(TransferOutcome {
                url: format!("http://mirror/{}", t.entry.name),
                bytes: 1,
                attempts: 2,
            })
        })
        .unwrap();
        assert_eq!(summary.mirror_fallbacks, 3);
        assert_eq!(summary.attempts, 6);
    }

    #[test]
    fn duplicate_destinations_rejected_up_front() {
        let mut batch = tasks(2);
        batch[1].destination = batch[0].destination.clone();
        let called = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&called);
        let err = run_with(batch, 2, &Progress::new(), None, move |t| {
            c.fetch_add(1, Ordering::SeqCst);
            ok(t)
        })
        .unwrap_err();
        assert!(matches!(err, TransferError::DuplicateDestination(_)));
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_worker_is_reported() {
        let err = run_with(tasks(2), 1, &Progress::new(), None, |_| panic!("boom")).unwrap_err();
        assert!(matches!(err, TransferError::WorkerPanicked));
    }
}

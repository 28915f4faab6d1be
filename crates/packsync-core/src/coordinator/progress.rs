//! Shared progress counters for a download batch.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Point-in-time view of a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressStats {
    pub completed: usize,
    pub total: usize,
    pub bytes_done: u64,
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Completed fraction in `[0, 1]`; an empty batch counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

/// Cloneable handle; reads never block the workers.
#[derive(Debug, Clone)]
pub struct Progress {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    completed: AtomicUsize,
    total: AtomicUsize,
    bytes: AtomicU64,
    origin: Instant,
    /// Nanoseconds from `origin` to the current batch's `begin`.
    batch_start: AtomicU64,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                completed: AtomicUsize::new(0),
                total: AtomicUsize::new(0),
                bytes: AtomicU64::new(0),
                origin: Instant::now(),
                batch_start: AtomicU64::new(0),
            }),
        }
    }

    pub fn completed(&self) -> usize {
        self.inner.completed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.inner.total.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ProgressStats {
        ProgressStats {
            completed: self.completed(),
            total: self.total(),
            bytes_done: self.inner.bytes.load(Ordering::Relaxed),
            elapsed_secs: self.elapsed().as_secs_f64(),
        }
    }

    fn elapsed(&self) -> Duration {
        let start = Duration::from_nanos(self.inner.batch_start.load(Ordering::Relaxed));
        self.inner.origin.elapsed().saturating_sub(start)
    }

    /// Reset counters and the clock for a new batch.
    pub(super) fn begin(&self, total: usize) {
        let now = u64::try_from(self.inner.origin.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.inner.batch_start.store(now, Ordering::Relaxed);
        self.inner.completed.store(0, Ordering::Relaxed);
        self.inner.bytes.store(0, Ordering::Relaxed);
        self.inner.total.store(total, Ordering::Relaxed);
    }

    pub(super) fn file_done(&self, bytes: u64) {
        self.inner.bytes.fetch_add(bytes, Ordering::Relaxed);
        self.inner.completed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_of_empty_batch_is_one() {
        let p = Progress::new();
        p.begin(0);
        assert_eq!(p.snapshot().fraction(), 1.0);
        assert!(p.snapshot().is_done());
    }

    #[test]
    fn counts_are_shared_between_clones() {
        let p = Progress::new();
        let q = p.clone();
        p.begin(4);
        q.file_done(10);
        q.file_done(5);
        let s = p.snapshot();
        assert_eq!((s.completed, s.total, s.bytes_done), (2, 4, 15));
        assert_eq!(s.fraction(), 0.5);
    }

    #[test]
    fn begin_restarts_the_clock() {
        let p = Progress::new();
        std::thread::sleep(Duration::from_millis(120));
        assert!(p.snapshot().elapsed_secs >= 0.1);
        p.begin(3);
        assert!(p.snapshot().elapsed_secs < 0.1);
    }
}

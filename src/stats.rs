//! Download pool statistics.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Totals for everything a pool processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadStats {
    /// Tasks that ended with a complete file.
    pub succeeded: usize,
    /// Tasks abandoned after their last attempt.
    pub failed: usize,
    /// Transfer attempts across all tasks, retries included.
    pub attempts: usize,
    /// Bytes written by successful transfers.
    pub total_bytes: u64,
    /// Time from pool start until the last worker finished.
    pub elapsed: Duration,
}

impl Default for DownloadStats {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadStats {
    /// Creates empty stats.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            succeeded: 0,
            failed: 0,
            attempts: 0,
            total_bytes: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Number of tasks that reached a terminal state.
    #[must_use]
    pub const fn finished(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Returns the average download speed in bytes per second.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn average_speed(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.total_bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}

/// Lock-free counters updated by pool workers.
#[derive(Debug)]
pub struct DownloadStatsTracker {
    start_time: Instant,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    attempts: AtomicUsize,
    total_bytes: AtomicU64,
}

impl Default for DownloadStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadStatsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            total_bytes: AtomicU64::new(0),
        }
    }

    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, bytes: u64) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a copy of the counters as they are now.
    #[must_use]
    pub fn snapshot(&self) -> DownloadStats {
        DownloadStats {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }
}

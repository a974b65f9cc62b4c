/// Scan progress shared between the scanner thread and the control thread.
///
/// The scanner is the only writer; anyone holding the `Arc` may read. A
/// relaxed load is enough because readers only want a recent value, not a
/// consistent cut across the three counters.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ScanningProgress {
    files_scanned: AtomicU64,
    directories_scanned: AtomicU64,
    bytes_processed: AtomicU64,
}

impl ScanningProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.files_scanned.store(0, Ordering::Relaxed);
        self.directories_scanned.store(0, Ordering::Relaxed);
        self.bytes_processed.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_file(&self, size: u64) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        self.bytes_processed.fetch_add(size, Ordering::Relaxed);
    }

    pub(crate) fn record_directory(&self) {
        self.directories_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            directories_scanned: self.directories_scanned.load(Ordering::Relaxed),
            bytes_processed: self.bytes_processed.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of the counters, handed to callbacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub files_scanned: u64,
    pub directories_scanned: u64,
    pub bytes_processed: u64,
}

/// Where a scan is in its lifecycle, as seen from the control thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ScanStatus {
    Running,
    Completed,
    Cancelled,
    /// The worker went away without reporting an outcome.
    Failed,
}

/// Final figures for a completed scan.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ScanSummary {
    pub progress: ProgressSnapshot,
    pub duration: Duration,
    /// Entries whose size or directory listing could not be read.
    pub error_count: u64,
    /// Nodes removed by the optional empty-entry pruning pass.
    pub pruned: usize,
}

/// Background filesystem scanning.
///
/// [`start_scan`] spawns a dedicated scanner thread that walks the root path,
/// builds a private [`FileTree`], aggregates directory sizes and hands the
/// finished tree back exactly once through a bounded channel. The control
/// thread drives the returned [`ScanHandle`] with [`ScanHandle::tick`]: that
/// is where progress callbacks fire (throttled) and where the completion
/// callback receives the tree. Nothing user-supplied ever runs on the
/// scanner thread.
pub mod file_size;
pub mod progress;
pub(crate) mod walker;

use crate::error::ScanError;
use crate::model::FileTree;
pub use progress::{ProgressSnapshot, ScanStatus, ScanSummary, ScanningProgress};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Tunables for a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Minimum time between two `on_progress` calls.
    pub progress_interval: Duration,
    /// Remove zero-size files and directories once sizes are aggregated.
    pub prune_empty: bool,
    /// Threads reading directories. `1` walks serially.
    pub walk_threads: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(250),
            prune_empty: false,
            walk_threads: num_cpus::get(),
        }
    }
}

pub type ProgressCallback = Box<dyn FnMut(ProgressSnapshot)>;
pub type CompletionCallback = Box<dyn FnOnce(ScanSummary, FileTree)>;

/// Everything needed to start a scan.
pub struct ScanParameters {
    pub path: PathBuf,
    pub options: ScanOptions,
    pub on_progress: Option<ProgressCallback>,
    pub on_complete: Option<CompletionCallback>,
}

impl ScanParameters {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: ScanOptions::default(),
            on_progress: None,
            on_complete: None,
        }
    }

    pub fn options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn on_progress(mut self, callback: impl FnMut(ProgressSnapshot) + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn on_complete(mut self, callback: impl FnOnce(ScanSummary, FileTree) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

/// What the scanner thread reports when it stops.
enum ScanOutcome {
    Completed { tree: FileTree, summary: ScanSummary },
    Cancelled,
}

/// Control-thread side of a running or finished scan.
pub struct ScanHandle {
    progress: Arc<ScanningProgress>,
    cancel_flag: Arc<AtomicBool>,
    outcome_rx: Receiver<ScanOutcome>,
    on_progress: Option<ProgressCallback>,
    on_complete: Option<CompletionCallback>,
    progress_interval: Duration,
    last_progress: Instant,
    status: ScanStatus,
    thread: Option<thread::JoinHandle<()>>,
}

impl ScanHandle {
    /// Ask the scanner to stop. The partial tree is discarded and neither
    /// callback fires afterwards.
    pub fn cancel(&mut self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
        if self.status == ScanStatus::Running {
            info!("scan cancelled");
            self.status = ScanStatus::Cancelled;
        }
        self.on_progress = None;
        self.on_complete = None;
    }

    pub fn is_active(&self) -> bool {
        self.status == ScanStatus::Running
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    /// Current counters, readable at any time.
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Periodic pump, called from the control thread.
    ///
    /// Delivers the tree to `on_complete` once the scanner is done, otherwise
    /// fires `on_progress` if the progress interval has elapsed.
    pub fn tick(&mut self) -> ScanStatus {
        if self.status != ScanStatus::Running {
            return self.status;
        }

        match self.outcome_rx.try_recv() {
            Ok(ScanOutcome::Completed { tree, summary }) => {
                self.status = ScanStatus::Completed;
                self.on_progress = None;
                self.join_worker();
                if let Some(on_complete) = self.on_complete.take() {
                    on_complete(summary, tree);
                }
            }
            Ok(ScanOutcome::Cancelled) => {
                self.status = ScanStatus::Cancelled;
                self.on_progress = None;
                self.on_complete = None;
                self.join_worker();
            }
            Err(TryRecvError::Empty) => {
                if self.last_progress.elapsed() >= self.progress_interval {
                    self.last_progress = Instant::now();
                    let snapshot = self.progress.snapshot();
                    if let Some(on_progress) = self.on_progress.as_mut() {
                        on_progress(snapshot);
                    }
                }
            }
            Err(TryRecvError::Disconnected) => {
                warn!("scanner thread exited without a result");
                self.status = ScanStatus::Failed;
                self.on_progress = None;
                self.on_complete = None;
                self.join_worker();
            }
        }
        self.status
    }

    /// Pump [`tick`](Self::tick) every `poll` until the scan leaves `Running`.
    pub fn wait(&mut self, poll: Duration) -> ScanStatus {
        loop {
            let status = self.tick();
            if status != ScanStatus::Running {
                return status;
            }
            thread::sleep(poll);
        }
    }

    fn join_worker(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("scanner thread panicked");
            }
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        // An abandoned scan should not keep walking the disk.
        self.cancel_flag.store(true, Ordering::Relaxed);
    }
}

/// Start scanning `parameters.path` on a background thread.
pub fn start_scan(parameters: ScanParameters) -> Result<ScanHandle, ScanError> {
    let ScanParameters {
        path,
        options,
        on_progress,
        on_complete,
    } = parameters;

    let metadata = std::fs::metadata(&path).map_err(|source| ScanError::RootUnavailable {
        path: path.clone(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory { path });
    }

    let progress = Arc::new(ScanningProgress::new());
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let (outcome_tx, outcome_rx) = crossbeam_channel::bounded::<ScanOutcome>(1);

    let worker_progress = progress.clone();
    let worker_cancel = cancel_flag.clone();
    let progress_interval = options.progress_interval;

    let thread = thread::Builder::new()
        .name("skyline-scanner".into())
        .spawn(move || run_scan(path, options, worker_progress, worker_cancel, outcome_tx))
        .map_err(ScanError::Spawn)?;

    Ok(ScanHandle {
        progress,
        cancel_flag,
        outcome_rx,
        on_progress,
        on_complete,
        progress_interval,
        last_progress: Instant::now(),
        status: ScanStatus::Running,
        thread: Some(thread),
    })
}

/// Body of the scanner thread.
fn run_scan(
    root_path: PathBuf,
    options: ScanOptions,
    progress: Arc<ScanningProgress>,
    cancel_flag: Arc<AtomicBool>,
    outcome_tx: Sender<ScanOutcome>,
) {
    let start = Instant::now();
    info!("Starting scan of {}", root_path.display());
    progress.reset();

    let mut tree = FileTree::with_root_name(&walker::root_display_name(&root_path));
    let root = tree.root();

    let walked = walker::populate(
        &mut tree,
        root,
        &root_path,
        walker::walk_parallelism(options.walk_threads),
        &progress,
        &cancel_flag,
    );
    let error_count = match walked {
        Ok(error_count) => error_count,
        Err(walker::Cancelled) => {
            debug!("scan of {} cancelled after {:?}", root_path.display(), start.elapsed());
            drop(tree);
            let _ = outcome_tx.send(ScanOutcome::Cancelled);
            return;
        }
    };

    tree.aggregate_sizes();
    let pruned = if options.prune_empty {
        tree.prune_empty()
    } else {
        0
    };

    let summary = ScanSummary {
        progress: progress.snapshot(),
        duration: start.elapsed(),
        error_count,
        pruned,
    };
    info!(
        "Scan complete: {} files, {} directories, {} bytes in {:?} ({} errors)",
        summary.progress.files_scanned,
        summary.progress.directories_scanned,
        summary.progress.bytes_processed,
        summary.duration,
        summary.error_count
    );

    // A cancel that lands after the walk still wins.
    let outcome = if cancel_flag.load(Ordering::Relaxed) {
        ScanOutcome::Cancelled
    } else {
        ScanOutcome::Completed { tree, summary }
    };
    let _ = outcome_tx.send(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = ScanOptions::default();
        assert_eq!(options.progress_interval, Duration::from_millis(250));
        assert!(!options.prune_empty);
        assert!(options.walk_threads >= 1);
    }

    #[test]
    fn missing_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = start_scan(ScanParameters::new(dir.path().join("nope")));
        assert!(matches!(result, Err(ScanError::RootUnavailable { .. })));
    }

    #[test]
    fn file_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        let result = start_scan(ScanParameters::new(file));
        assert!(matches!(result, Err(ScanError::NotADirectory { .. })));
    }
}

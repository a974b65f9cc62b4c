/// Live filesystem change monitor.
///
/// A `notify` watcher subscribes to the OS change feed for the whole subtree
/// below the root. Its raw events are drained by a dedicated monitor thread,
/// normalized into [`FileChangeNotification`]s and pushed onto an unbounded
/// queue. The control thread pops them with
/// [`MonitorHandle::fetch_next_change`] whenever it is ready to apply them.
///
/// # Usage
///
/// ```ignore
/// let monitor = start_monitoring("/data", |change| debug!("{:?}", change.kind))?;
/// while let Some(change) = monitor.fetch_next_change() {
///     updater.apply(&mut tree, &change);
/// }
/// monitor.stop();
/// ```
///
/// # Shutdown
///
/// [`MonitorHandle::stop`] raises a flag that the thread checks at least once
/// per [`POLL_INTERVAL`], then joins it. The watcher lives on that thread and
/// is dropped when it exits.
pub mod normalize;
pub mod notification;

pub use normalize::EventNormalizer;
pub use notification::{FileChangeKind, FileChangeNotification};

use crate::error::MonitorError;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest the monitor thread blocks before re-checking the stop flag and
/// flushing half-finished renames.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Handle to a running monitor. Stops the monitor when dropped.
pub struct MonitorHandle {
    root: PathBuf,
    stop_flag: Arc<AtomicBool>,
    receiver: Receiver<FileChangeNotification>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching and wait for the monitor thread to exit. Idempotent.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        let thread = self.thread.lock().take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                warn!("monitor thread panicked");
            }
            info!("Stopped monitoring {}", self.root.display());
        }
    }

    pub fn is_active(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
            && self
                .thread
                .lock()
                .as_ref()
                .is_some_and(|thread| !thread.is_finished())
    }

    /// Pop the oldest pending change without blocking.
    ///
    /// Changes queued before [`stop`](Self::stop) remain fetchable.
    pub fn fetch_next_change(&self) -> Option<FileChangeNotification> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start watching `path` recursively.
///
/// `on_notification` runs on the monitor thread once for every change, right
/// after that change has been queued. The same change is still delivered by
/// [`MonitorHandle::fetch_next_change`]; the callback is for observing, so
/// keep it cheap and do not touch the tree from it.
pub fn start_monitoring<F>(
    path: impl Into<PathBuf>,
    on_notification: F,
) -> Result<MonitorHandle, MonitorError>
where
    F: Fn(&FileChangeNotification) + Send + 'static,
{
    let root = path.into();
    std::fs::metadata(&root).map_err(|source| MonitorError::PathUnavailable {
        path: root.clone(),
        source,
    })?;

    let (raw_tx, raw_rx) = unbounded::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = raw_tx.send(res);
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    let (tx, rx) = unbounded::<FileChangeNotification>();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop_flag);
    let normalizer = EventNormalizer::new(&root);

    let thread = thread::Builder::new()
        .name("skyline-monitor".to_owned())
        .spawn(move || run_monitor(watcher, normalizer, raw_rx, tx, thread_stop, on_notification))
        .map_err(MonitorError::Spawn)?;

    info!("Monitoring {}", root.display());
    Ok(MonitorHandle {
        root,
        stop_flag,
        receiver: rx,
        thread: Mutex::new(Some(thread)),
    })
}

// ─── Background thread ──────────────────────────────────────────────────────

fn run_monitor<F: Fn(&FileChangeNotification)>(
    watcher: RecommendedWatcher,
    mut normalizer: EventNormalizer,
    raw_rx: Receiver<notify::Result<Event>>,
    tx: Sender<FileChangeNotification>,
    stop_flag: Arc<AtomicBool>,
    on_notification: F,
) {
    let mut batch: Vec<FileChangeNotification> = Vec::new();

    while !stop_flag.load(Ordering::Relaxed) {
        match raw_rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => normalizer.push(&event, &mut batch),
            Ok(Err(err)) => warn!("watcher error: {err}"),
            Err(RecvTimeoutError::Timeout) => normalizer.flush(&mut batch),
            Err(RecvTimeoutError::Disconnected) => {
                debug!("watcher channel closed");
                break;
            }
        }

        if batch.is_empty() {
            continue;
        }
        for notification in batch.drain(..) {
            if !queue(&tx, notification, &on_notification) {
                // Receiver gone: the handle was dropped.
                return;
            }
        }
    }

    drop(watcher);
    normalizer.flush(&mut batch);
    for notification in batch {
        queue(&tx, notification, &on_notification);
    }
}

/// Push one change and report it. Returns `false` once nobody is listening.
fn queue<F: Fn(&FileChangeNotification)>(
    tx: &Sender<FileChangeNotification>,
    notification: FileChangeNotification,
    on_notification: &F,
) -> bool {
    debug!("{:?} {}", notification.kind, notification.path.display());
    let observed = notification.clone();
    if tx.send(notification).is_err() {
        return false;
    }
    on_notification(&observed);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = start_monitoring(dir.path().join("absent"), |_| {});
        assert!(matches!(result, Err(MonitorError::PathUnavailable { .. })));
    }

    #[test]
    fn stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = start_monitoring(dir.path(), |_| {}).unwrap();
        assert!(monitor.is_active());
        monitor.stop();
        assert!(!monitor.is_active());
        monitor.stop();
        assert!(!monitor.is_active());
    }
}

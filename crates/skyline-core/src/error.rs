/// Error types for the fallible entry points.
///
/// Everything past startup is non-fatal: unreadable entries, unresolvable
/// change notifications and degenerate layouts are logged and absorbed.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read scan root {path}: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan root {path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("failed to spawn scanner thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("cannot monitor {path}: {source}")]
    PathUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("filesystem watcher failed: {0}")]
    Watcher(#[from] notify::Error),

    #[error("failed to spawn monitor thread: {0}")]
    Spawn(#[source] std::io::Error),
}

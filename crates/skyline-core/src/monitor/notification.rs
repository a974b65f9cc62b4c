use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FileChangeKind {
    Created,
    Deleted,
    Modified,
    Renamed,
}

/// One filesystem change, relative to the monitored root.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileChangeNotification {
    pub path: PathBuf,
    pub kind: FileChangeKind,
    /// Where the entry used to live. Only set for [`FileChangeKind::Renamed`].
    pub previous_path: Option<PathBuf>,
    pub observed_at: DateTime<Local>,
}

impl FileChangeNotification {
    pub fn new(kind: FileChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind,
            previous_path: None,
            observed_at: Local::now(),
        }
    }

    pub fn renamed(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            path: to.into(),
            kind: FileChangeKind::Renamed,
            previous_path: Some(from.into()),
            observed_at: Local::now(),
        }
    }
}

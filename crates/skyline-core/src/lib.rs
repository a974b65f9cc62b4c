/// Skyline Core: scanning, squarified layout, and live change tracking.
///
/// This crate turns a directory tree into nested 3D blocks whose footprint
/// area is proportional to size on disk, then keeps that layout current as
/// files change. It has no rendering dependencies; a frontend uploads the
/// vertex buffer and draws it.
///
/// # Modules
///
/// - [`model`]: Generic slot-arena tree, traversals, block geometry, file records.
/// - [`scanner`]: Background filesystem scan with throttled progress reporting.
/// - [`layout`]: Squarified treemap layout and vertex buffer generation.
/// - [`monitor`]: Recursive change watcher feeding a notification queue.
/// - [`update`]: Applies change notifications to a laid-out tree.
/// - [`session`]: Control-thread facade tying a tree to its monitor.
pub mod error;
pub mod layout;
pub mod model;
pub mod monitor;
pub mod scanner;
pub mod session;
pub mod update;

pub use error::{MonitorError, ScanError};
pub use model::{Block, FileTree, NodeId, Point3, Tree, VizBlock};
pub use scanner::{start_scan, ScanHandle, ScanOptions, ScanParameters};
pub use session::{HighlightFilter, TreemapSession};

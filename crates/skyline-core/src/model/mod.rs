/// Data model for the Skyline file tree.
///
/// A generic arena [`Tree`] carries [`VizBlock`] payloads: the file facts
/// gathered by the scanner plus the block geometry assigned by the layout.
pub mod block;
pub mod file_node;
pub mod file_tree;
pub mod size;
pub mod traversal;
pub mod tree;

pub use block::{Block, Point3};
pub use file_node::{FileKind, FileRecord, VizBlock};
pub use file_tree::FileTree;
pub use size::{format_count, format_size, SizePrefix};
pub use traversal::{Leaves, PostOrder, PreOrder, Siblings};
pub use tree::{Ancestors, Node, NodeId, Tree};

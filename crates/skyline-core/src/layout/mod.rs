/// Squarified 3D treemap layout.
///
/// Pure functions over a [`FileTree`]: no I/O, no threads, deterministic for
/// a given tree and root block. The root block is the ground slab; every
/// other node's block is carved out of its parent's roof in proportion to
/// the node's size, so the finished layout reads as a city whose districts
/// are directories and whose towers are files.
pub mod geometry;
mod squarify;

pub use geometry::{build_vertex_buffer, BlockVertex, VERTICES_PER_BLOCK};

use crate::model::{Block, FileTree, NodeId, Point3};
use std::time::Instant;
use tracing::{debug, info};

pub const BLOCK_HEIGHT: f64 = 2.0;
pub const ROOT_BLOCK_WIDTH: f64 = 1000.0;
pub const ROOT_BLOCK_DEPTH: f64 = 1000.0;

/// Ground slab used when the caller has no preference.
pub fn default_root_bounds() -> Block {
    Block::new(Point3::ORIGIN, ROOT_BLOCK_WIDTH, BLOCK_HEIGHT, ROOT_BLOCK_DEPTH)
}

/// Lay out the whole tree inside `root_bounds`.
pub fn layout(tree: &mut FileTree, root_bounds: Block) {
    let start = Instant::now();
    let root = tree.root();
    tree[root].block = Block::new(
        root_bounds.origin,
        root_bounds.width,
        root_bounds.height,
        root_bounds.depth,
    );
    layout_subtree(tree, root);
    info!("Laid out {} nodes in {:?}", tree.size(), start.elapsed());
}

/// Re-lay-out everything below `node`, keeping `node`'s own block.
///
/// Parents are handled before their children, so each child's block is
/// final by the time its own children are placed on it.
pub fn layout_subtree(tree: &mut FileTree, node: NodeId) {
    if !tree.contains(node) {
        debug!("layout requested for a node that no longer exists: {node:?}");
        return;
    }
    let order: Vec<NodeId> = tree
        .pre_order(node)
        .filter(|&id| tree[id].has_children())
        .collect();
    for parent in order {
        squarify::layout_children(tree, parent);
    }
}

/// The block currently assigned to `node`.
pub fn block_of(tree: &FileTree, node: NodeId) -> Option<Block> {
    tree.get(node).map(|n| n.block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileKind, FileRecord, VizBlock};

    const TOLERANCE: f64 = 1e-6;

    fn sample_tree() -> FileTree {
        let mut tree = FileTree::with_root_name("root");
        let root = tree.root();
        let src = tree.append_child(root, VizBlock::new(FileRecord::directory("src")));
        for (name, size) in [("main.rs", 700), ("lib.rs", 200), ("util.rs", 100)] {
            tree.append_child(
                src,
                VizBlock::new(FileRecord::from_file_name(name, size, FileKind::Regular)),
            );
        }
        let assets = tree.append_child(root, VizBlock::new(FileRecord::directory("assets")));
        tree.append_child(
            assets,
            VizBlock::new(FileRecord::from_file_name("logo.png", 3000, FileKind::Regular)),
        );
        tree.append_child(
            root,
            VizBlock::new(FileRecord::from_file_name("README.md", 0, FileKind::Regular)),
        );
        tree.aggregate_sizes();
        tree
    }

    #[test]
    fn every_child_sits_inside_its_parent() {
        let mut tree = sample_tree();
        layout(&mut tree, default_root_bounds());

        let root = tree.root();
        for id in tree.pre_order(root).filter(|&id| id != root) {
            let parent = tree[id].parent().unwrap();
            let child_block = tree[id].block;
            let parent_block = tree[parent].block;
            assert!(parent_block.footprint_contains(&child_block, TOLERANCE));
            if child_block.has_volume() {
                let floor = parent_block.origin.y + parent_block.height;
                assert!((child_block.origin.y - floor).abs() < TOLERANCE);
                assert_eq!(child_block.height, parent_block.height);
            }
        }
    }

    #[test]
    fn nested_children_fill_their_directory() {
        let mut tree = sample_tree();
        layout(&mut tree, default_root_bounds());

        let src = tree.find_node(std::path::Path::new("src")).unwrap();
        let covered: f64 = tree
            .siblings(src)
            .map(|id| tree[id].block.footprint_area())
            .sum();
        assert!((covered - tree[src].block.footprint_area()).abs() < 1e-3);
    }

    #[test]
    fn layout_is_deterministic() {
        let mut first = sample_tree();
        let mut second = sample_tree();
        layout(&mut first, default_root_bounds());
        layout(&mut second, default_root_bounds());

        let blocks = |tree: &FileTree| -> Vec<Block> {
            tree.pre_order(tree.root()).map(|id| tree[id].block).collect()
        };
        assert_eq!(blocks(&first), blocks(&second));
    }

    #[test]
    fn relayout_after_growth_shifts_space() {
        let mut tree = sample_tree();
        layout(&mut tree, default_root_bounds());
        let src = tree.find_node(std::path::Path::new("src")).unwrap();
        let before = tree[src].block.footprint_area();

        let main = tree.find_node(std::path::Path::new("src/main.rs")).unwrap();
        tree[main].file.size = 10_000;
        tree.update_ancestor_sizes(main);
        let root = tree.root();
        layout_subtree(&mut tree, root);

        assert!(tree[src].block.footprint_area() > before);
    }

    #[test]
    fn block_of_stale_node_is_none() {
        let mut tree = sample_tree();
        let src = tree.find_node(std::path::Path::new("src")).unwrap();
        tree.remove_node(src);
        assert_eq!(block_of(&tree, src), None);
        assert!(block_of(&tree, tree.root()).is_some());
    }
}

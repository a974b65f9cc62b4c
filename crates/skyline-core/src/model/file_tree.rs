/// The file tree produced by a scan and kept live by the updater.
///
/// `FileTree` is the generic arena [`Tree`] instantiated with [`VizBlock`]
/// payloads. The root node represents the scanned directory itself; every
/// other node is addressed by its path relative to that root.
use super::file_node::{FileKind, FileRecord, VizBlock};
use super::tree::{NodeId, Tree};
use std::path::{Component, Path, PathBuf};

pub type FileTree = Tree<VizBlock>;

impl Tree<VizBlock> {
    /// Create a tree whose root is the directory `name`.
    pub fn with_root_name(name: &str) -> Self {
        Tree::new(VizBlock::new(FileRecord::directory(name)))
    }

    /// Total logical size, i.e. the root's aggregated size.
    pub fn total_size(&self) -> u64 {
        self[self.root()].file.size
    }

    /// Recompute every directory size in one bottom-up pass.
    ///
    /// Post-order guarantees each child is final before its parent sums it.
    /// Safe to call repeatedly; directory sizes are recomputed, never added to.
    pub fn aggregate_sizes(&mut self) {
        let root = self.root();
        self.aggregate_subtree(root);
    }

    /// Same as [`aggregate_sizes`](Self::aggregate_sizes) limited to one subtree.
    pub fn aggregate_subtree(&mut self, scope: NodeId) {
        let order: Vec<NodeId> = self.post_order(scope).collect();
        for id in order {
            if self[id].file.is_directory() {
                let total = self.children_size(id);
                self[id].file.size = total;
            }
        }
    }

    /// Re-sum the directory chain above `id`, nearest parent first.
    pub fn update_ancestor_sizes(&mut self, id: NodeId) {
        let chain: Vec<NodeId> = self.ancestors(id).collect();
        for ancestor in chain {
            let total = self.children_size(ancestor);
            self[ancestor].file.size = total;
        }
    }

    fn children_size(&self, parent: NodeId) -> u64 {
        self.siblings(parent).map(|child| self[child].file.size).sum()
    }

    /// Drop every zero-size node below the root. Returns nodes released.
    ///
    /// Meant to run after aggregation, when an empty directory has only
    /// empty descendants.
    pub fn prune_empty(&mut self) -> usize {
        let root = self.root();
        let empty: Vec<NodeId> = self
            .pre_order(root)
            .filter(|&id| id != root && self[id].file.size == 0)
            .collect();
        // Descendants of an already-pruned directory are stale and release 0.
        empty.into_iter().map(|id| self.remove_node(id)).sum()
    }

    /// Path of `id` relative to the root. The root itself maps to `""`.
    pub fn relative_path(&self, id: NodeId) -> PathBuf {
        let mut segments: Vec<String> = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if self.is_root(node_id) {
                break;
            }
            let Some(node) = self.get(node_id) else { break };
            segments.push(node.file.file_name());
            current = node.parent();
        }
        segments.iter().rev().collect()
    }

    /// Direct child of `parent` whose on-disk name is `file_name`.
    pub fn find_child(&self, parent: NodeId, file_name: &str) -> Option<NodeId> {
        self.siblings(parent)
            .find(|&child| self[child].file.has_file_name(file_name))
    }

    /// Resolve a root-relative path by walking its components from the root.
    ///
    /// Only plain components (and `.`) are understood; anything that would
    /// climb out of the tree resolves to `None`.
    pub fn find_node(&self, relative: &Path) -> Option<NodeId> {
        let mut current = self.root();
        for component in relative.components() {
            match component {
                Component::CurDir => continue,
                Component::Normal(name) => {
                    current = self.find_child(current, name.to_str()?)?;
                }
                _ => return None,
            }
        }
        Some(current)
    }

    /// Reorder every directory at or below `scope` so children run largest
    /// first. Ties keep their current order; the layout is unaffected.
    pub fn order_by_size(&mut self, scope: NodeId) {
        let directories: Vec<NodeId> = self
            .pre_order(scope)
            .filter(|&id| self[id].has_children())
            .collect();
        for directory in directories {
            self.sort_children_by(directory, |a, b| b.file.size.cmp(&a.file.size));
        }
    }

    /// Counts of (files, directories) below `scope`, excluding `scope` itself.
    pub fn count_kinds(&self, scope: NodeId) -> (u64, u64) {
        self.pre_order(scope)
            .filter(|&id| id != scope)
            .fold((0, 0), |(files, dirs), id| match self[id].file.kind {
                FileKind::Directory => (files, dirs + 1),
                FileKind::Regular | FileKind::Symlink => (files + 1, dirs),
            })
    }
}

/// Applies filesystem change notifications to a live [`FileTree`].
///
/// [`IncrementalUpdater::apply`] makes the structural edit for one change
/// and remembers which directories it touched. [`IncrementalUpdater::refresh`]
/// then re-aggregates sizes along those directories' ancestor chains and
/// re-lays-out the smallest subtree that covers every directory whose
/// children changed, so a burst of changes costs one aggregation and one
/// layout pass.
///
/// Changes that cannot be resolved against the tree (unknown parent, entry
/// already gone) are dropped and logged at debug level.
use crate::layout::layout_subtree;
use crate::model::{FileKind, FileRecord, FileTree, NodeId, VizBlock};
use crate::monitor::{FileChangeKind, FileChangeNotification};
use crate::scanner::walker;
use crate::scanner::ScanningProgress;
use jwalk::Parallelism;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use tracing::{debug, info};

/// What one [`IncrementalUpdater::refresh`] covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Changes applied since the previous refresh.
    pub applied: usize,
    /// Changes dropped since the previous refresh.
    pub dropped: usize,
    pub nodes_added: usize,
    pub nodes_removed: usize,
    /// Subtree that was re-laid-out, if any change needed it.
    pub layout_root: Option<NodeId>,
}

#[derive(Debug)]
pub struct IncrementalUpdater {
    root_path: PathBuf,
    /// Directories whose child set or child sizes changed.
    dirty: Vec<NodeId>,
    pending: RefreshSummary,
}

impl IncrementalUpdater {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            dirty: Vec::new(),
            pending: RefreshSummary::default(),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Apply one change to `tree`. Returns `false` if it was dropped.
    pub fn apply(&mut self, tree: &mut FileTree, change: &FileChangeNotification) -> bool {
        let applied = match change.kind {
            FileChangeKind::Created => self.on_created(tree, &change.path),
            FileChangeKind::Deleted => self.on_deleted(tree, &change.path),
            FileChangeKind::Modified => self.on_modified(tree, &change.path),
            FileChangeKind::Renamed => match &change.previous_path {
                Some(previous) => self.on_renamed(tree, previous, &change.path),
                None => self.on_created(tree, &change.path),
            },
        };
        if applied {
            self.pending.applied += 1;
        } else {
            self.pending.dropped += 1;
            debug!("dropped {:?} for {}", change.kind, change.path.display());
        }
        applied
    }

    /// Re-aggregate touched ancestor chains and re-lay-out what moved.
    pub fn refresh(&mut self, tree: &mut FileTree) -> RefreshSummary {
        let mut dirty: Vec<NodeId> = std::mem::take(&mut self.dirty)
            .into_iter()
            .filter(|&id| tree.contains(id))
            .collect();
        dirty.sort_by_key(|&id| (std::cmp::Reverse(tree.depth(id)), id));
        dirty.dedup();

        // Parents of nodes whose size changed also need their rows redone.
        let mut layout_dirty = dirty.clone();
        for &directory in &dirty {
            let mut current = Some(directory);
            while let Some(id) = current {
                let parent = tree[id].parent();
                if !tree[id].file.is_directory() {
                    current = parent;
                    continue;
                }
                let before = tree[id].file.size;
                let after: u64 = tree.siblings(id).map(|c| tree[c].file.size).sum();
                if before != after {
                    tree[id].file.size = after;
                    if let Some(parent) = parent {
                        layout_dirty.push(parent);
                    }
                }
                current = parent;
            }
        }

        let layout_root = layout_dirty
            .into_iter()
            .reduce(|a, b| tree.lowest_common_ancestor(a, b).unwrap_or(tree.root()));
        if let Some(scope) = layout_root {
            layout_subtree(tree, scope);
        }

        let summary = RefreshSummary {
            layout_root,
            ..std::mem::take(&mut self.pending)
        };
        if summary.applied > 0 || summary.dropped > 0 {
            info!(
                "Refreshed treemap: {} applied, {} dropped, +{} -{} nodes",
                summary.applied, summary.dropped, summary.nodes_added, summary.nodes_removed
            );
        }
        summary
    }

    // ── Handlers ────────────────────────────────────────────────────

    fn on_created(&mut self, tree: &mut FileTree, relative: &Path) -> bool {
        if tree.find_node(relative).is_some() {
            // Duplicate event, or already picked up by a directory walk.
            return self.on_modified(tree, relative);
        }
        let Some(parent) = self.resolve_parent(tree, relative) else {
            return false;
        };
        let Some(file_name) = relative.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return false;
        };
        let full_path = self.root_path.join(relative);
        let Ok(metadata) = std::fs::symlink_metadata(&full_path) else {
            // Already gone again.
            return false;
        };

        let kind = kind_of(&metadata);
        let size = if kind.is_directory() { 0 } else { metadata.len() };
        let id = tree.append_child(
            parent,
            VizBlock::new(FileRecord::from_file_name(&file_name, size, kind)),
        );

        if kind.is_directory() {
            let walked = walker::populate(
                tree,
                id,
                &full_path,
                Parallelism::Serial,
                &ScanningProgress::new(),
                &AtomicBool::new(false),
            );
            if let Ok(errors) = walked {
                if errors > 0 {
                    debug!("{errors} unreadable entries below {}", full_path.display());
                }
            }
            tree.aggregate_subtree(id);
        }

        self.pending.nodes_added += tree.subtree_size(id);
        self.dirty.push(parent);
        true
    }

    fn on_deleted(&mut self, tree: &mut FileTree, relative: &Path) -> bool {
        let Some(id) = tree.find_node(relative) else {
            return false;
        };
        let Some(parent) = tree[id].parent() else {
            return false;
        };
        self.pending.nodes_removed += tree.remove_node(id);
        self.dirty.push(parent);
        true
    }

    /// Bring the node at `relative` in line with the disk. Also handles the
    /// undirected events the monitor reports as `Modified`: a path that is
    /// gone is deleted, a path the tree does not know yet is created.
    fn on_modified(&mut self, tree: &mut FileTree, relative: &Path) -> bool {
        let metadata = std::fs::symlink_metadata(self.root_path.join(relative));
        let Some(id) = tree.find_node(relative) else {
            return metadata.is_ok() && self.on_created(tree, relative);
        };
        let Some(parent) = tree[id].parent() else {
            return false;
        };
        let Ok(metadata) = metadata else {
            return self.on_deleted(tree, relative);
        };

        let kind = kind_of(&metadata);
        if !kind.is_directory() && tree[id].has_children() {
            // A directory was replaced by a file of the same name.
            let children: Vec<NodeId> = tree.siblings(id).collect();
            for child in children {
                self.pending.nodes_removed += tree.remove_node(child);
            }
        }

        let node = &mut tree[id];
        let before = (node.file.size, node.file.kind);
        node.file.kind = kind;
        if !kind.is_directory() {
            node.file.size = metadata.len();
        }
        if (node.file.size, node.file.kind) != before {
            self.dirty.push(parent);
        }
        if kind.is_directory() {
            // Directories keep their aggregated size; refresh re-sums them.
            self.dirty.push(id);
        }
        true
    }

    fn on_renamed(&mut self, tree: &mut FileTree, previous: &Path, relative: &Path) -> bool {
        let Some(id) = tree.find_node(previous) else {
            return self.on_created(tree, relative);
        };
        let Some(old_parent) = tree[id].parent() else {
            return false;
        };
        let Some(new_parent) = self.resolve_parent(tree, relative) else {
            // Moved somewhere the tree does not know about.
            return self.on_deleted(tree, previous);
        };
        let Some(file_name) = relative.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return false;
        };

        // Renaming over an existing entry replaces it.
        if let Some(existing) = tree.find_node(relative) {
            if existing != id {
                self.pending.nodes_removed += tree.remove_node(existing);
                self.dirty.push(new_parent);
            }
        }

        if new_parent != old_parent {
            if !tree.move_node(id, new_parent) {
                return false;
            }
            self.dirty.push(old_parent);
            self.dirty.push(new_parent);
        }
        tree[id].file.rename(&file_name);
        true
    }

    /// Directory node that should hold `relative`.
    fn resolve_parent(&self, tree: &FileTree, relative: &Path) -> Option<NodeId> {
        let parent = tree.find_node(relative.parent()?)?;
        tree[parent].file.is_directory().then_some(parent)
    }
}

fn kind_of(metadata: &Metadata) -> FileKind {
    let file_type = metadata.file_type();
    if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_symlink() {
        FileKind::Symlink
    } else {
        FileKind::Regular
    }
}

/// Control-thread owner of one laid-out tree.
///
/// A [`TreemapSession`] takes the tree a scan produced, lays it out, and from
/// then on is the only place that mutates it: change notifications from the
/// monitor are applied here, selection and highlight markers are toggled
/// here, and the vertex buffer is rebuilt from here. Dropping the session
/// stops its monitor and releases the tree.
use crate::error::MonitorError;
use crate::layout::{build_vertex_buffer, layout, BlockVertex};
use crate::model::{Block, FileTree, NodeId};
use crate::monitor::{start_monitoring, FileChangeNotification, MonitorHandle};
use crate::update::{IncrementalUpdater, RefreshSummary};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Limits which nodes a highlight operation may mark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightFilter {
    /// Nodes smaller than this are never highlighted.
    pub minimum_file_size: u64,
    /// Only directories are highlighted.
    pub only_directories: bool,
}

impl HighlightFilter {
    fn admits(&self, tree: &FileTree, id: NodeId) -> bool {
        let file = &tree[id].file;
        (!self.only_directories || file.is_directory()) && file.size >= self.minimum_file_size
    }
}

pub struct TreemapSession {
    root_path: PathBuf,
    tree: FileTree,
    root_bounds: Block,
    updater: IncrementalUpdater,
    monitor: Option<MonitorHandle>,
    selected: Option<NodeId>,
    highlighted: Vec<NodeId>,
}

impl TreemapSession {
    /// Take ownership of a scanned tree and lay it out inside `root_bounds`.
    pub fn new(root_path: impl Into<PathBuf>, mut tree: FileTree, root_bounds: Block) -> Self {
        let root_path = root_path.into();
        layout(&mut tree, root_bounds);
        Self {
            updater: IncrementalUpdater::new(root_path.clone()),
            root_path,
            tree,
            root_bounds,
            monitor: None,
            selected: None,
            highlighted: Vec::new(),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn root_bounds(&self) -> Block {
        self.root_bounds
    }

    /// Lay the whole tree out again inside new bounds.
    pub fn set_root_bounds(&mut self, root_bounds: Block) {
        self.root_bounds = root_bounds;
        layout(&mut self.tree, root_bounds);
    }

    pub fn find_node(&self, relative: &Path) -> Option<NodeId> {
        self.tree.find_node(relative)
    }

    /// List every directory's children largest first. Block geometry does
    /// not change.
    pub fn order_by_size(&mut self) {
        let root = self.tree.root();
        self.tree.order_by_size(root);
    }

    // ── Monitoring ──────────────────────────────────────────────────

    /// Start watching the session root. Replaces any running monitor.
    ///
    /// `on_notification` sees every change on the monitor thread as it is
    /// queued; the changes are applied by [`refresh_treemap`](Self::refresh_treemap).
    pub fn start_monitoring<F>(&mut self, on_notification: F) -> Result<(), MonitorError>
    where
        F: Fn(&FileChangeNotification) + Send + 'static,
    {
        self.stop_monitoring();
        self.monitor = Some(start_monitoring(self.root_path.clone(), on_notification)?);
        Ok(())
    }

    pub fn stop_monitoring(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.as_ref().is_some_and(MonitorHandle::is_active)
    }

    /// Apply a change that did not come from the session's own monitor.
    pub fn apply_change(&mut self, change: &FileChangeNotification) -> bool {
        self.updater.apply(&mut self.tree, change)
    }

    /// Drain queued changes, apply them, then re-aggregate and re-lay-out once.
    pub fn refresh_treemap(&mut self) -> RefreshSummary {
        if let Some(monitor) = &self.monitor {
            while let Some(change) = monitor.fetch_next_change() {
                self.updater.apply(&mut self.tree, &change);
            }
        }
        let summary = self.updater.refresh(&mut self.tree);
        self.forget_released_nodes();
        summary
    }

    /// Drop markers that point at nodes removed by the last refresh.
    fn forget_released_nodes(&mut self) {
        if self.selected.is_some_and(|id| !self.tree.contains(id)) {
            self.selected = None;
        }
        let tree = &self.tree;
        self.highlighted.retain(|&id| tree.contains(id));
    }

    // ── Selection ───────────────────────────────────────────────────

    /// Mark `id` as the selected node, clearing any previous selection.
    pub fn select_node(&mut self, id: NodeId) -> bool {
        if !self.tree.contains(id) {
            return false;
        }
        self.clear_selection();
        self.tree[id].selected = true;
        self.selected = Some(id);
        true
    }

    pub fn selected_node(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn clear_selection(&mut self) {
        if let Some(id) = self.selected.take() {
            if let Some(node) = self.tree.get_mut(id) {
                node.selected = false;
            }
        }
    }

    // ── Highlighting ────────────────────────────────────────────────

    pub fn highlighted_nodes(&self) -> &[NodeId] {
        &self.highlighted
    }

    pub fn clear_highlights(&mut self) {
        for id in self.highlighted.drain(..) {
            if let Some(node) = self.tree.get_mut(id) {
                node.highlighted = false;
            }
        }
    }

    /// Replace the current highlights with `candidates` that pass `filter`.
    fn highlight(&mut self, candidates: Vec<NodeId>, filter: &HighlightFilter) -> usize {
        self.clear_highlights();
        for id in candidates {
            if filter.admits(&self.tree, id) {
                self.tree[id].highlighted = true;
                self.highlighted.push(id);
            }
        }
        debug!("highlighted {} nodes", self.highlighted.len());
        self.highlighted.len()
    }

    /// Highlight every ancestor of `id`, nearest first.
    pub fn highlight_ancestors(&mut self, id: NodeId, filter: &HighlightFilter) -> usize {
        let candidates: Vec<NodeId> = self.tree.ancestors(id).collect();
        self.highlight(candidates, filter)
    }

    /// Highlight everything below `id`.
    pub fn highlight_descendants(&mut self, id: NodeId, filter: &HighlightFilter) -> usize {
        if !self.tree.contains(id) {
            return self.highlight(Vec::new(), filter);
        }
        let candidates: Vec<NodeId> = self.tree.pre_order(id).skip(1).collect();
        self.highlight(candidates, filter)
    }

    /// Highlight every file with `extension`; the leading dot is optional.
    pub fn highlight_matching_extension(
        &mut self,
        extension: &str,
        filter: &HighlightFilter,
    ) -> usize {
        let wanted = if extension.starts_with('.') || extension.is_empty() {
            extension.to_owned()
        } else {
            format!(".{extension}")
        };
        let tree = &self.tree;
        let candidates: Vec<NodeId> = tree
            .pre_order(tree.root())
            .filter(|&id| {
                let file = &tree[id].file;
                !file.is_directory() && file.extension == wanted.as_str()
            })
            .collect();
        self.highlight(candidates, filter)
    }

    /// Highlight nodes whose name contains `query`, ignoring case.
    pub fn highlight_matching_names(
        &mut self,
        query: &str,
        include_files: bool,
        include_directories: bool,
        filter: &HighlightFilter,
    ) -> usize {
        let needle = query.to_lowercase();
        let tree = &self.tree;
        let root = tree.root();
        let candidates: Vec<NodeId> = tree
            .pre_order(root)
            .filter(|&id| id != root)
            .filter(|&id| {
                let file = &tree[id].file;
                let wanted_kind = if file.is_directory() {
                    include_directories
                } else {
                    include_files
                };
                wanted_kind && file.file_name().to_lowercase().contains(&needle)
            })
            .collect();
        self.highlight(candidates, filter)
    }

    // ── Rendering handoff ───────────────────────────────────────────

    pub fn vertex_buffer(&mut self) -> Vec<BlockVertex> {
        build_vertex_buffer(&mut self.tree)
    }
}

impl Drop for TreemapSession {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

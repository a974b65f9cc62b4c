/// `jwalk`-driven directory walk that grows a [`FileTree`] in place.
///
/// Directory reads fan out over a rayon pool; entries come back in
/// depth-first order and are consumed serially on the calling thread, so the
/// tree itself is never shared. Each directory is registered in a path map
/// as soon as it is inserted so its children find their parent without a
/// search. If jwalk ever hands out a child before its parent (it should not),
/// the missing ancestor chain is created on the spot.
use super::file_size::query_size;
use super::progress::ScanningProgress;
use crate::model::{FileKind, FileRecord, FileTree, NodeId, VizBlock};
use jwalk::{Parallelism, WalkDir};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// The walk stopped because the cancel flag was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cancelled;

/// Rayon pool for directory reads, named so it shows up in thread dumps.
///
/// Falls back to letting jwalk build an anonymous pool if the named one
/// cannot be created.
pub(crate) fn walk_parallelism(threads: usize) -> Parallelism {
    let threads = threads.max(1);
    if threads == 1 {
        return Parallelism::Serial;
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("skyline-walk-{i}"))
        .build()
    {
        Ok(pool) => Parallelism::RayonExistingPool {
            pool: Arc::new(pool),
            busy_timeout: None,
        },
        Err(err) => {
            debug!("named walk pool unavailable ({err}), using jwalk's own pool");
            Parallelism::RayonNewPool(threads)
        }
    }
}

/// Walk `anchor_path` and append everything below it under `anchor`.
///
/// `anchor` must already exist and represent `anchor_path`; it is not
/// counted. Returns the number of entries whose size or listing could not be
/// read. Those entries stay in the tree: files with size 0, unreadable
/// directories as empty directories.
pub(crate) fn populate(
    tree: &mut FileTree,
    anchor: NodeId,
    anchor_path: &Path,
    parallelism: Parallelism,
    progress: &ScanningProgress,
    cancel_flag: &AtomicBool,
) -> Result<u64, Cancelled> {
    let mut error_count: u64 = 0;

    let mut dir_map: HashMap<PathBuf, NodeId> = HashMap::with_capacity(1_024);
    dir_map.insert(anchor_path.to_path_buf(), anchor);

    let walker = WalkDir::new(anchor_path)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(parallelism);

    for entry_result in walker {
        if cancel_flag.load(Ordering::Relaxed) {
            return Err(Cancelled);
        }

        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                error_count += 1;
                debug!("unreadable entry: {err}");
                continue;
            }
        };

        let path = entry.path();
        if path == anchor_path {
            continue;
        }
        let Some(parent_path) = path.parent() else {
            continue;
        };

        let parent = match dir_map.get(parent_path) {
            Some(&id) => id,
            None => ensure_ancestors(tree, &mut dir_map, parent_path, anchor_path, anchor),
        };

        let file_name = entry.file_name().to_string_lossy();
        let file_type = entry.file_type();

        if file_type.is_dir() {
            let id = tree.append_child(parent, VizBlock::new(FileRecord::directory(&file_name)));
            progress.record_directory();
            // Listing failures surface on the directory's own entry; the
            // node stays as an empty directory.
            if let Some(err) = &entry.read_children_error {
                error_count += 1;
                debug!("unreadable directory {}: {err}", path.display());
            }
            dir_map.insert(path, id);
        } else {
            let kind = if file_type.is_symlink() {
                FileKind::Symlink
            } else {
                FileKind::Regular
            };
            let size = query_size(&path);
            if add_file(tree, parent, &file_name, kind, size, progress).is_none() {
                error_count += 1;
            }
        }
    }

    Ok(error_count)
}

/// Append a non-directory entry. An entry whose size could not be read is
/// kept with size 0; the returned id is `None` in that case so the caller
/// can count it.
fn add_file(
    tree: &mut FileTree,
    parent: NodeId,
    file_name: &str,
    kind: FileKind,
    size: Option<u64>,
    progress: &ScanningProgress,
) -> Option<NodeId> {
    let record = FileRecord::from_file_name(file_name, size.unwrap_or(0), kind);
    let id = tree.append_child(parent, VizBlock::new(record));
    progress.record_file(size.unwrap_or(0));
    size.map(|_| id)
}

/// Create any directories between `anchor_path` and `target` that are not in
/// the map yet, returning the node for `target`.
fn ensure_ancestors(
    tree: &mut FileTree,
    dir_map: &mut HashMap<PathBuf, NodeId>,
    target: &Path,
    anchor_path: &Path,
    anchor: NodeId,
) -> NodeId {
    let mut missing: Vec<PathBuf> = Vec::new();
    let mut current = target.to_path_buf();

    while !dir_map.contains_key(&current) && current != anchor_path {
        missing.push(current.clone());
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    let mut parent = dir_map.get(&current).copied().unwrap_or(anchor);
    for ancestor in missing.into_iter().rev() {
        let name = ancestor
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let id = tree.append_child(parent, VizBlock::new(FileRecord::directory(&name)));
        dir_map.insert(ancestor, id);
        parent = id;
    }
    parent
}

/// Display name for a walk root: its last component, or the whole path for
/// roots such as `/` or `C:\`.
pub(crate) fn root_display_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

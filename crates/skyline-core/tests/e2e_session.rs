/// End-to-end tests for the scan → layout → incremental update pipeline.
///
/// A real directory is scanned, handed to a `TreemapSession`, then changed
/// on disk. Changes are fed in as notifications so the results do not
/// depend on watcher timing.
use skyline_core::layout::default_root_bounds;
use skyline_core::model::{FileTree, NodeId};
use skyline_core::monitor::{FileChangeKind, FileChangeNotification};
use skyline_core::scanner::{start_scan, ScanParameters, ScanStatus};
use skyline_core::session::TreemapSession;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

const EPSILON: f64 = 1e-6;

fn scan(root: &Path) -> FileTree {
    let slot: Rc<RefCell<Option<FileTree>>> = Rc::new(RefCell::new(None));
    let sink = slot.clone();
    let mut handle = start_scan(
        ScanParameters::new(root).on_complete(move |_, tree| *sink.borrow_mut() = Some(tree)),
    )
    .unwrap();
    assert_eq!(handle.wait(Duration::from_millis(5)), ScanStatus::Completed);
    let tree = slot.borrow_mut().take();
    tree.expect("completed scan must deliver a tree")
}

/// ```text
/// root/
///   src/
///     main.rs   (4 000 bytes)
///     lib.rs    (1 000 bytes)
///   assets/
///     logo.png  (3 000 bytes)
///   README.md   (10 bytes)
/// ```
fn build_project(root: &Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("assets")).unwrap();
    fs::write(root.join("src/main.rs"), vec![b'x'; 4_000]).unwrap();
    fs::write(root.join("src/lib.rs"), vec![b'x'; 1_000]).unwrap();
    fs::write(root.join("assets/logo.png"), vec![0u8; 3_000]).unwrap();
    fs::write(root.join("README.md"), vec![b'#'; 10]).unwrap();
}

/// Every parent with a non-zero size is tiled exactly by its children, and
/// no two siblings overlap.
fn assert_layout_invariants(tree: &FileTree) {
    for parent in tree.pre_order(tree.root()) {
        if !tree[parent].has_children() || tree[parent].file.size == 0 {
            continue;
        }
        let parent_block = tree[parent].block;
        let children: Vec<NodeId> = tree.siblings(parent).collect();

        let mut area = 0.0;
        for &child in &children {
            let block = tree[child].block;
            assert!(
                parent_block.footprint_contains(&block, EPSILON),
                "{} escapes its parent",
                tree.relative_path(child).display()
            );
            let floor = parent_block.origin.y + parent_block.height;
            assert!((block.origin.y - floor).abs() < EPSILON);
            area += block.footprint_area();
        }
        let expected = parent_block.footprint_area();
        assert!(
            (area - expected).abs() <= expected * 1e-9 + EPSILON,
            "children of {} cover {area}, parent is {expected}",
            tree.relative_path(parent).display()
        );

        for (i, &a) in children.iter().enumerate() {
            for &b in &children[i + 1..] {
                assert!(!tree[a].block.footprint_overlaps(&tree[b].block, EPSILON));
            }
        }
    }
}

#[test]
fn scanned_tree_is_laid_out_consistently() {
    let tmp = TempDir::new().unwrap();
    build_project(tmp.path());

    let session = TreemapSession::new(tmp.path(), scan(tmp.path()), default_root_bounds());
    let tree = session.tree();

    assert_eq!(tree.total_size(), 8_010);
    assert_layout_invariants(tree);

    // Footprint areas are proportional to size.
    let root_area = tree[tree.root()].block.footprint_area();
    let main = session.find_node(Path::new("src/main.rs")).unwrap();
    let src = session.find_node(Path::new("src")).unwrap();
    let src_area = tree[src].block.footprint_area();
    assert!((src_area / root_area - 5_000.0 / 8_010.0).abs() < 1e-9);
    assert!((tree[main].block.footprint_area() / src_area - 0.8).abs() < 1e-9);
}

#[test]
fn created_file_updates_sizes_and_layout() {
    let tmp = TempDir::new().unwrap();
    build_project(tmp.path());
    let mut session = TreemapSession::new(tmp.path(), scan(tmp.path()), default_root_bounds());

    let before_nodes = session.tree().size();
    let assets = session.find_node(Path::new("assets")).unwrap();
    let assets_before = session.tree()[assets].file.size;

    fs::write(tmp.path().join("assets/icon.png"), vec![0u8; 500]).unwrap();
    assert!(session.apply_change(&FileChangeNotification::new(
        FileChangeKind::Created,
        "assets/icon.png"
    )));
    let summary = session.refresh_treemap();

    let tree = session.tree();
    assert_eq!(tree.size(), before_nodes + 1);
    assert_eq!(tree[assets].file.size, assets_before + 500);
    assert_eq!(tree.total_size(), 8_510);
    assert_eq!(summary.nodes_added, 1);
    assert!(summary.layout_root.is_some());
    assert_layout_invariants(tree);
}

#[test]
fn deleted_directory_releases_its_subtree() {
    let tmp = TempDir::new().unwrap();
    build_project(tmp.path());
    let mut session = TreemapSession::new(tmp.path(), scan(tmp.path()), default_root_bounds());

    let src = session.find_node(Path::new("src")).unwrap();
    session.select_node(src);

    fs::remove_dir_all(tmp.path().join("src")).unwrap();
    session.apply_change(&FileChangeNotification::new(FileChangeKind::Deleted, "src"));
    let summary = session.refresh_treemap();

    assert_eq!(summary.nodes_removed, 3);
    assert!(!session.tree().contains(src));
    assert_eq!(session.selected_node(), None);
    assert_eq!(session.tree().total_size(), 3_010);
    assert_layout_invariants(session.tree());
}

#[test]
fn rename_across_directories_keeps_the_node() {
    let tmp = TempDir::new().unwrap();
    build_project(tmp.path());
    let mut session = TreemapSession::new(tmp.path(), scan(tmp.path()), default_root_bounds());

    let readme = session.find_node(Path::new("README.md")).unwrap();
    fs::rename(tmp.path().join("README.md"), tmp.path().join("assets/README.txt")).unwrap();
    session.apply_change(&FileChangeNotification::renamed("README.md", "assets/README.txt"));
    session.refresh_treemap();

    let tree = session.tree();
    assert_eq!(session.find_node(Path::new("assets/README.txt")), Some(readme));
    assert_eq!(tree[readme].file.extension, ".txt");
    let assets = session.find_node(Path::new("assets")).unwrap();
    assert_eq!(tree[assets].file.size, 3_010);
    assert_eq!(tree.total_size(), 8_010);
    assert_layout_invariants(tree);
}

#[test]
fn resizing_the_root_relays_out_everything() {
    let tmp = TempDir::new().unwrap();
    build_project(tmp.path());
    let mut session = TreemapSession::new(tmp.path(), scan(tmp.path()), default_root_bounds());

    let mut bounds = default_root_bounds();
    bounds.width = 40.0;
    bounds.depth = 10.0;
    session.set_root_bounds(bounds);

    let root = session.tree().root();
    assert!((session.tree()[root].block.footprint_area() - 400.0).abs() < EPSILON);
    assert_layout_invariants(session.tree());
    assert_eq!(session.vertex_buffer().len() % 30, 0);
}

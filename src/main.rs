//! Skyline: 3D squarified treemap of a directory.
//!
//! Thin binary entry point. All logic lives in the `skyline-core` crate;
//! this scans a path, lays it out, and prints or exports the result.

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use skyline_core::layout::{BLOCK_HEIGHT, ROOT_BLOCK_DEPTH, ROOT_BLOCK_WIDTH};
use skyline_core::model::{format_count, format_size, Block, FileTree, NodeId, Point3, SizePrefix};
use skyline_core::scanner::{start_scan, ScanOptions, ScanParameters, ScanStatus, ScanSummary};
use skyline_core::session::TreemapSession;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Scan a directory and lay it out as a 3D squarified treemap.
#[derive(Parser, Debug)]
#[command(name = "skyline", version)]
struct Cli {
    /// Directory to scan.
    path: PathBuf,

    /// Root block width (x axis).
    #[arg(long, default_value_t = ROOT_BLOCK_WIDTH)]
    width: f64,

    /// Root block depth (z axis).
    #[arg(long, default_value_t = ROOT_BLOCK_DEPTH)]
    depth: f64,

    /// Height of every block.
    #[arg(long, default_value_t = BLOCK_HEIGHT)]
    height: f64,

    /// Drop zero-byte files and directories after the scan.
    #[arg(long)]
    prune_empty: bool,

    /// Directory-reading threads. Defaults to one per CPU.
    #[arg(long)]
    threads: Option<usize>,

    /// Print the summary as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Export every node and its block to a CSV file.
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Keep watching for changes for this many seconds after the scan.
    #[arg(long, value_name = "SECONDS")]
    watch: Option<u64>,

    /// Number of top-level entries listed in the summary.
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Use decimal (KB, MB) instead of binary (KiB, MiB) size units.
    #[arg(long)]
    decimal: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    root: &'a Path,
    scan: ScanSummary,
    nodes: usize,
    total_size: u64,
    largest: Vec<Entry>,
}

#[derive(Serialize)]
struct Entry {
    path: PathBuf,
    kind: &'static str,
    size: u64,
    block: Block,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    path: &'a str,
    kind: &'static str,
    size: u64,
    x: f64,
    y: f64,
    z: f64,
    width: f64,
    height: f64,
    depth: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.width <= 0.0 || cli.depth <= 0.0 || cli.height < 0.0 {
        bail!("root block dimensions must be positive");
    }
    let prefix = if cli.decimal {
        SizePrefix::Decimal
    } else {
        SizePrefix::Binary
    };

    let mut options = ScanOptions {
        prune_empty: cli.prune_empty,
        ..Default::default()
    };
    if let Some(threads) = cli.threads {
        options.walk_threads = threads.max(1);
    }

    let (scan, tree) = scan(&cli.path, options, prefix)?;
    let bounds = Block::new(Point3::ORIGIN, cli.width, cli.height, cli.depth);
    let mut session = TreemapSession::new(cli.path.clone(), tree, bounds);
    session.order_by_size();

    print_summary(&session, scan, cli.top, cli.json, prefix)?;

    if let Some(csv_path) = &cli.csv {
        export_csv(session.tree(), csv_path)
            .with_context(|| format!("failed to write {}", csv_path.display()))?;
        tracing::info!("Exported blocks to {}", csv_path.display());
    }

    if let Some(seconds) = cli.watch {
        watch(&mut session, Duration::from_secs(seconds), prefix)?;
    }

    Ok(())
}

/// Run a scan on the current thread's tick loop and return its result.
fn scan(
    path: &Path,
    options: ScanOptions,
    prefix: SizePrefix,
) -> anyhow::Result<(ScanSummary, FileTree)> {
    let delivered: Rc<RefCell<Option<(ScanSummary, FileTree)>>> = Rc::new(RefCell::new(None));
    let sink = delivered.clone();

    let mut handle = start_scan(
        ScanParameters::new(path)
            .options(options)
            .on_progress(move |p| {
                eprintln!(
                    "  {} files, {} directories, {}",
                    format_count(p.files_scanned),
                    format_count(p.directories_scanned),
                    format_size(p.bytes_processed, prefix)
                );
            })
            .on_complete(move |summary, tree| *sink.borrow_mut() = Some((summary, tree))),
    )
    .with_context(|| format!("cannot scan {}", path.display()))?;

    match handle.wait(Duration::from_millis(50)) {
        ScanStatus::Completed => {}
        status => bail!("scan ended with status {status:?}"),
    }
    let result = delivered.borrow_mut().take();
    result.context("scan completed without delivering a tree")
}

fn print_summary(
    session: &TreemapSession,
    scan: ScanSummary,
    top: usize,
    json: bool,
    prefix: SizePrefix,
) -> anyhow::Result<()> {
    let tree = session.tree();
    let largest: Vec<Entry> = tree
        .siblings(tree.root())
        .take(top)
        .map(|id| entry(tree, id))
        .collect();

    if json {
        let summary = Summary {
            root: session.root_path(),
            scan,
            nodes: tree.size(),
            total_size: tree.total_size(),
            largest,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", session.root_path().display());
    println!(
        "  {} files, {} directories, {} in {:.2?}",
        format_count(scan.progress.files_scanned),
        format_count(scan.progress.directories_scanned),
        format_size(tree.total_size(), prefix),
        scan.duration
    );
    if scan.error_count > 0 {
        println!("  {} entries could not be read", format_count(scan.error_count));
    }
    if scan.pruned > 0 {
        println!("  {} empty entries pruned", format_count(scan.pruned as u64));
    }
    println!();
    for item in &largest {
        let b = item.block;
        println!(
            "  {:>10}  {:<9}  {:<40}  at ({:.1}, {:.1}, {:.1}) {:.1} x {:.1}",
            format_size(item.size, prefix),
            item.kind,
            item.path.display(),
            b.origin.x,
            b.origin.y,
            b.origin.z,
            b.width,
            b.depth
        );
    }
    Ok(())
}

fn entry(tree: &FileTree, id: NodeId) -> Entry {
    let node = &tree[id];
    Entry {
        path: tree.relative_path(id),
        kind: node.file.kind.label(),
        size: node.file.size,
        block: node.block,
    }
}

fn export_csv(tree: &FileTree, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for id in tree.pre_order(tree.root()) {
        let node = &tree[id];
        let relative = tree.relative_path(id);
        let relative = relative.to_string_lossy();
        let b = node.block;
        writer.serialize(CsvRow {
            path: &relative,
            kind: node.file.kind.label(),
            size: node.file.size,
            x: b.origin.x,
            y: b.origin.y,
            z: b.origin.z,
            width: b.width,
            height: b.height,
            depth: b.depth,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Apply live changes for `duration`, refreshing once per second.
fn watch(
    session: &mut TreemapSession,
    duration: Duration,
    prefix: SizePrefix,
) -> anyhow::Result<()> {
    session.start_monitoring(|change| {
        tracing::debug!("{:?} {}", change.kind, change.path.display());
    })?;
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        std::thread::sleep(Duration::from_secs(1).min(remaining));
        let summary = session.refresh_treemap();
        if summary.applied > 0 || summary.dropped > 0 {
            let tree = session.tree();
            let (files, directories) = tree.count_kinds(tree.root());
            println!(
                "  refresh: {} applied, {} dropped, +{} -{} nodes, {} files, {} directories, {}",
                summary.applied,
                summary.dropped,
                summary.nodes_added,
                summary.nodes_removed,
                format_count(files),
                format_count(directories),
                format_size(tree.total_size(), prefix)
            );
        }
    }
    session.stop_monitoring();
    Ok(())
}

/// Turns raw `notify` events into [`FileChangeNotification`]s.
///
/// Backends disagree on how renames arrive. inotify sends a `From` and a
/// `To` half sharing a tracker cookie, usually followed by a combined `Both`
/// event. Windows sends the halves without a tracker. FSEvents often cannot
/// tell which side an event is and reports `Any`. The normalizer folds all
/// of these into one `Renamed` notification where it can, and into
/// `Deleted`/`Created` where it cannot. Events that do not say what happened
/// become `Modified`; the updater checks the disk for those. Nothing here
/// touches the filesystem beyond canonicalizing the root once.
use super::notification::{FileChangeKind, FileChangeNotification};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use std::path::{Path, PathBuf};
use tracing::trace;

/// A `From` half still waiting for its `To`.
#[derive(Debug)]
struct PendingRename {
    path: PathBuf,
    tracker: Option<usize>,
}

#[derive(Debug)]
pub struct EventNormalizer {
    /// The root as given plus its canonical form; backends may report either.
    roots: Vec<PathBuf>,
    pending: Option<PendingRename>,
    /// Last pair emitted from halves, so a trailing `Both` is not doubled.
    last_pair: Option<(PathBuf, PathBuf)>,
}

impl EventNormalizer {
    pub fn new(root: &Path) -> Self {
        let mut roots = vec![root.to_path_buf()];
        if let Ok(canonical) = root.canonicalize() {
            if canonical != root {
                roots.push(canonical);
            }
        }
        Self {
            roots,
            pending: None,
            last_pair: None,
        }
    }

    /// Path relative to the root, or `None` for the root itself and for
    /// anything outside it.
    fn relative(&self, path: &Path) -> Option<PathBuf> {
        self.roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    /// Fold one raw event into `out`.
    pub fn push(&mut self, event: &Event, out: &mut Vec<FileChangeNotification>) {
        trace!("raw event {:?} {:?}", event.kind, event.paths);
        match event.kind {
            EventKind::Access(_) => return,
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                self.flush(out);
                self.pending = event.paths.first().and_then(|p| {
                    self.relative(p).map(|path| PendingRename {
                        path,
                        tracker: event.tracker(),
                    })
                });
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                let Some(to) = event.paths.first().and_then(|p| self.relative(p)) else {
                    self.flush(out);
                    return;
                };
                match self.pending.take() {
                    Some(from) if from.tracker == event.tracker() => {
                        self.last_pair = Some((from.path.clone(), to.clone()));
                        out.push(FileChangeNotification::renamed(from.path, to));
                    }
                    other => {
                        self.pending = other;
                        self.flush(out);
                        out.push(FileChangeNotification::new(FileChangeKind::Created, to));
                    }
                }
                return;
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                self.pending_to_deleted(out);
                let from = event.paths.first().and_then(|p| self.relative(p));
                let to = event.paths.get(1).and_then(|p| self.relative(p));
                let pair = self.last_pair.take();
                match (from, to) {
                    (Some(from), Some(to)) => {
                        if pair.as_ref() != Some(&(from.clone(), to.clone())) {
                            out.push(FileChangeNotification::renamed(from, to));
                        }
                    }
                    // Moved out of the root.
                    (Some(from), None) => {
                        out.push(FileChangeNotification::new(FileChangeKind::Deleted, from));
                    }
                    // Moved in from outside.
                    (None, Some(to)) => {
                        out.push(FileChangeNotification::new(FileChangeKind::Created, to));
                    }
                    (None, None) => {}
                }
                return;
            }
            EventKind::Create(_) => {
                self.flush(out);
                self.emit_all(event, FileChangeKind::Created, out);
            }
            EventKind::Remove(_) => {
                self.flush(out);
                self.emit_all(event, FileChangeKind::Deleted, out);
            }
            // Undirected renames and events the backend could not classify.
            EventKind::Modify(_) | EventKind::Any | EventKind::Other => {
                self.flush(out);
                self.emit_all(event, FileChangeKind::Modified, out);
            }
        }
        self.last_pair = None;
    }

    /// Resolve anything still pending. Call when the event stream goes quiet.
    pub fn flush(&mut self, out: &mut Vec<FileChangeNotification>) {
        self.pending_to_deleted(out);
        self.last_pair = None;
    }

    fn pending_to_deleted(&mut self, out: &mut Vec<FileChangeNotification>) {
        if let Some(pending) = self.pending.take() {
            // Renamed to somewhere we do not watch.
            out.push(FileChangeNotification::new(FileChangeKind::Deleted, pending.path));
        }
    }

    fn emit_all(&self, event: &Event, kind: FileChangeKind, out: &mut Vec<FileChangeNotification>) {
        out.extend(
            event
                .paths
                .iter()
                .filter_map(|p| self.relative(p))
                .map(|rel| FileChangeNotification::new(kind, rel)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};

    const ROOT: &str = "/watched/root";

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    fn run(events: &[Event]) -> Vec<(FileChangeKind, PathBuf, Option<PathBuf>)> {
        let mut normalizer = EventNormalizer::new(Path::new(ROOT));
        let mut out = Vec::new();
        for e in events {
            normalizer.push(e, &mut out);
        }
        normalizer.flush(&mut out);
        out.into_iter()
            .map(|n| (n.kind, n.path, n.previous_path))
            .collect()
    }

    #[test]
    fn basic_kinds_map_directly() {
        let out = run(&[
            event(EventKind::Create(CreateKind::File), &["/watched/root/a.txt"]),
            event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/watched/root/a.txt"],
            ),
            event(EventKind::Remove(RemoveKind::File), &["/watched/root/a.txt"]),
        ]);
        let kinds: Vec<_> = out.iter().map(|(k, p, _)| (*k, p.clone())).collect();
        assert_eq!(
            kinds,
            [
                (FileChangeKind::Created, PathBuf::from("a.txt")),
                (FileChangeKind::Modified, PathBuf::from("a.txt")),
                (FileChangeKind::Deleted, PathBuf::from("a.txt")),
            ]
        );
    }

    #[test]
    fn access_events_are_ignored() {
        let out = run(&[event(
            EventKind::Access(AccessKind::Read),
            &["/watched/root/a.txt"],
        )]);
        assert!(out.is_empty());
    }

    #[test]
    fn paired_halves_become_one_rename() {
        let out = run(&[
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                &["/watched/root/old.txt"],
            )
            .set_tracker(9),
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                &["/watched/root/dir/new.txt"],
            )
            .set_tracker(9),
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/watched/root/old.txt", "/watched/root/dir/new.txt"],
            )
            .set_tracker(9),
        ]);
        assert_eq!(
            out,
            [(
                FileChangeKind::Renamed,
                PathBuf::from("dir/new.txt"),
                Some(PathBuf::from("old.txt"))
            )]
        );
    }

    #[test]
    fn both_event_alone_is_a_rename() {
        let out = run(&[event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/watched/root/a", "/watched/root/b"],
        )]);
        assert_eq!(
            out,
            [(FileChangeKind::Renamed, PathBuf::from("b"), Some(PathBuf::from("a")))]
        );
    }

    #[test]
    fn unpaired_halves_degrade_to_delete_and_create() {
        let out = run(&[
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                &["/watched/root/gone"],
            )
            .set_tracker(1),
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                &["/watched/root/came"],
            )
            .set_tracker(2),
        ]);
        assert_eq!(
            out,
            [
                (FileChangeKind::Deleted, PathBuf::from("gone"), None),
                (FileChangeKind::Created, PathBuf::from("came"), None),
            ]
        );
    }

    #[test]
    fn dangling_from_is_flushed_as_delete() {
        let out = run(&[event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/watched/root/moved-away"],
        )]);
        assert_eq!(out, [(FileChangeKind::Deleted, PathBuf::from("moved-away"), None)]);
    }

    #[test]
    fn undirected_rename_is_left_to_the_updater() {
        let out = run(&[
            event(EventKind::Modify(ModifyKind::Name(RenameMode::Any)), &["/watched/root/a"]),
            event(EventKind::Other, &["/watched/root/b"]),
        ]);
        assert_eq!(
            out,
            [
                (FileChangeKind::Modified, PathBuf::from("a"), None),
                (FileChangeKind::Modified, PathBuf::from("b"), None),
            ]
        );
    }

    #[test]
    fn root_and_outside_paths_are_dropped() {
        let out = run(&[
            event(EventKind::Modify(ModifyKind::Any), &[ROOT]),
            event(EventKind::Create(CreateKind::File), &["/elsewhere/file"]),
        ]);
        assert!(out.is_empty());
    }
}

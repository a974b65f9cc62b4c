/// Payload carried by every node of the file tree.
///
/// A [`VizBlock`] pairs the on-disk facts about an entry ([`FileRecord`])
/// with the block the layout engine assigned to it and the markers the
/// presentation layer toggles (selection, highlighting, vertex offset).
use super::block::Block;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
}

impl FileKind {
    pub fn is_directory(self) -> bool {
        self == FileKind::Directory
    }

    pub fn label(self) -> &'static str {
        match self {
            FileKind::Regular => "file",
            FileKind::Directory => "directory",
            FileKind::Symlink => "symlink",
        }
    }
}

/// Metadata for one file, directory or symlink.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File stem for files, the whole name for directories.
    pub name: CompactString,

    /// Extension including its leading dot (`".txt"`), or empty.
    /// Always empty for directories.
    pub extension: CompactString,

    /// Logical size in bytes. For directories, the sum of the direct
    /// children once an aggregation pass has run.
    pub size: u64,

    pub kind: FileKind,
}

impl FileRecord {
    /// Build a record from an on-disk name, splitting off the extension
    /// for anything that is not a directory.
    ///
    /// Dot-files such as `.gitignore` keep their whole name as the stem.
    pub fn from_file_name(file_name: &str, size: u64, kind: FileKind) -> Self {
        let (name, extension) = if kind.is_directory() {
            (file_name, "")
        } else {
            split_extension(file_name)
        };
        Self {
            name: CompactString::new(name),
            extension: CompactString::new(extension),
            size,
            kind,
        }
    }

    /// Shorthand for a directory record with no size yet.
    pub fn directory(name: &str) -> Self {
        Self::from_file_name(name, 0, FileKind::Directory)
    }

    /// The name as it appears on disk: `name + extension`.
    pub fn file_name(&self) -> String {
        let mut full = String::with_capacity(self.name.len() + self.extension.len());
        full.push_str(&self.name);
        full.push_str(&self.extension);
        full
    }

    /// `true` if `candidate` is this record's on-disk name.
    pub fn has_file_name(&self, candidate: &str) -> bool {
        candidate.len() == self.name.len() + self.extension.len()
            && candidate.starts_with(self.name.as_str())
            && candidate.ends_with(self.extension.as_str())
    }

    /// Replace name and extension after a rename.
    pub fn rename(&mut self, file_name: &str) {
        let renamed = Self::from_file_name(file_name, self.size, self.kind);
        self.name = renamed.name;
        self.extension = renamed.extension;
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }
}

fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name.split_at(dot),
        _ => (file_name, ""),
    }
}

/// Node payload: file facts, layout geometry and presentation markers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VizBlock {
    pub file: FileRecord,
    pub block: Block,
    pub selected: bool,
    pub highlighted: bool,

    /// Offset, in vertices, of this node's block in the last vertex buffer
    /// built. `None` when the block had no volume or no buffer was built.
    pub buffer_offset: Option<u32>,
}

impl VizBlock {
    pub fn new(file: FileRecord) -> Self {
        Self {
            file,
            block: Block::default(),
            selected: false,
            highlighted: false,
            buffer_offset: None,
        }
    }
}

impl From<FileRecord> for VizBlock {
    fn from(file: FileRecord) -> Self {
        Self::new(file)
    }
}

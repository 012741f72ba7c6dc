//! Lookup of what exists under the docs root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What a relative path under the docs root refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Answers whether a path relative to the docs root exists, and as what.
pub trait DocsTree {
    fn entry_kind(&self, relative: &Path) -> Option<EntryKind>;
}

/// [`DocsTree`] backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct FsDocsTree {
    root: PathBuf,
}

impl FsDocsTree {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl DocsTree for FsDocsTree {
    fn entry_kind(&self, relative: &Path) -> Option<EntryKind> {
        let metadata = std::fs::metadata(self.root.join(relative)).ok()?;
        if metadata.is_dir() {
            Some(EntryKind::Directory)
        } else if metadata.is_file() {
            Some(EntryKind::File)
        } else {
            None
        }
    }
}

impl DocsTree for BTreeMap<PathBuf, EntryKind> {
    fn entry_kind(&self, relative: &Path) -> Option<EntryKind> {
        self.get(relative).copied()
    }
}

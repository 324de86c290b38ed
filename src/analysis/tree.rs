//! Addressable source trees.
//!
//! Dependency extraction reads files only through [`SourceTree`], keyed by
//! tree-relative paths with `/` separators.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

/// Directories never listed, even without a `.gitignore` naming them.
pub const SKIPPED_DIRS: &[&str] = &["__pycache__", "node_modules", "venv", "site-packages"];

/// A set of files addressed by tree-relative paths.
pub trait SourceTree {
    /// Whether `path` names an existing file.
    fn is_file(&self, path: &str) -> bool;

    /// Raw bytes of the file at `path`.
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Every file in the tree, sorted.
    fn files(&self) -> Vec<String>;
}

/// A source tree rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FsSourceTree {
    root: PathBuf,
}

impl FsSourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl SourceTree for FsSourceTree {
    fn is_file(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }

    /// Hidden entries, `.gitignore`d paths and [`SKIPPED_DIRS`] are left out.
    fn files(&self) -> Vec<String> {
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .follow_links(false)
            .git_ignore(true)
            .git_exclude(true)
            .git_global(false)
            .require_git(false)
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(is_dir && entry.depth() > 0 && SKIPPED_DIRS.iter().any(|d| entry.file_name() == *d))
            })
            .build();

        let mut out = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
        out.sort();
        out
    }
}

/// An in-memory snapshot of a source tree.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceTree {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: &str, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.to_string(), contents.into());
    }

    /// Builder-style variant of [`MemorySourceTree::insert`].
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SourceTree for MemorySourceTree {
    fn is_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    fn files(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

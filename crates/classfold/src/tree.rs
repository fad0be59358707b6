//! File-tree abstraction over the staging area.
//!
//! Validation and normalization only ever see a [`FileTree`]. [`LocalTree`]
//! backs it with the real filesystem; [`MemoryTree`] keeps everything in a map
//! so the walk and the rename phase can be exercised without touching disk.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ClassfoldError, Result};

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One immediate child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Entry name (last path component).
    pub name: String,
    /// File or directory.
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Minimal filesystem surface needed by the validator and the upload step.
pub trait FileTree {
    /// Immediate children of `dir`, sorted by name.
    fn read_dir(&self, dir: &Path) -> Result<Vec<TreeEntry>>;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents.
    fn create_dir_all(&mut self, path: &Path) -> Result<()>;

    /// Move a file. Fails if `to` already exists.
    fn rename(&mut self, from: &Path, to: &Path) -> Result<()>;

    /// Read a whole file.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Every file below `root`, recursively, in sorted order.
    fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTree;

impl LocalTree {
    pub fn new() -> Self {
        Self
    }
}

impl FileTree for LocalTree {
    fn read_dir(&self, dir: &Path) -> Result<Vec<TreeEntry>> {
        let reader = fs::read_dir(dir).map_err(|e| ClassfoldError::io(dir, e))?;
        let mut entries = Vec::new();
        for entry in reader {
            let entry = entry.map_err(|e| ClassfoldError::io(dir, e))?;
            let path = entry.path();
            // Follow symlinks so a linked folder is treated like a folder.
            let metadata = fs::metadata(&path).map_err(|e| ClassfoldError::io(&path, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(if metadata.is_dir() {
                TreeEntry::dir(name)
            } else {
                TreeEntry::file(name)
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&mut self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| ClassfoldError::io(path, e))
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<()> {
        if to.exists() {
            return Err(ClassfoldError::io(
                to,
                io::Error::new(io::ErrorKind::AlreadyExists, "rename target exists"),
            ));
        }
        fs::rename(from, to).map_err(|e| ClassfoldError::io(from, e))
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| ClassfoldError::io(path, e))
    }

    fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                ClassfoldError::io(path, io::Error::other(e.to_string()))
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// An in-memory tree keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    nodes: BTreeMap<PathBuf, Node>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory and its parents.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
        self
    }

    /// Add a file with the given contents, creating parent directories.
    pub fn add_file(&mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> &mut Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.nodes.insert(path.to_path_buf(), Node::File(contents.into()));
        self
    }

    /// Whether `path` is a file.
    pub fn is_file(&self, path: impl AsRef<Path>) -> bool {
        matches!(self.nodes.get(path.as_ref()), Some(Node::File(_)))
    }

    /// Whether `path` is a directory.
    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        matches!(self.nodes.get(path.as_ref()), Some(Node::Dir))
    }

    /// All file paths, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn not_found(path: &Path) -> ClassfoldError {
        ClassfoldError::io(path, io::Error::new(io::ErrorKind::NotFound, "no such entry"))
    }
}

impl FileTree for MemoryTree {
    fn read_dir(&self, dir: &Path) -> Result<Vec<TreeEntry>> {
        if !self.is_dir(dir) {
            return Err(Self::not_found(dir));
        }
        // BTreeMap order is component-wise, so children come out sorted.
        let mut entries: Vec<TreeEntry> = self
            .nodes
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .filter_map(|(path, node)| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some(match node {
                    Node::Dir => TreeEntry::dir(name),
                    Node::File(_) => TreeEntry::file(name),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    fn create_dir_all(&mut self, path: &Path) -> Result<()> {
        if self.is_file(path) {
            return Err(ClassfoldError::io(
                path,
                io::Error::new(io::ErrorKind::AlreadyExists, "a file exists at this path"),
            ));
        }
        self.add_dir(path);
        Ok(())
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<()> {
        if self.nodes.contains_key(to) {
            return Err(ClassfoldError::io(
                to,
                io::Error::new(io::ErrorKind::AlreadyExists, "rename target exists"),
            ));
        }
        if let Some(parent) = to.parent() {
            if !parent.as_os_str().is_empty() && !self.is_dir(parent) {
                return Err(Self::not_found(parent));
            }
        }
        let moved: Vec<PathBuf> = self
            .nodes
            .keys()
            .filter(|path| path.starts_with(from))
            .cloned()
            .collect();
        if moved.is_empty() {
            return Err(Self::not_found(from));
        }
        for old in moved {
            if let Some(node) = self.nodes.remove(&old) {
                let suffix = old.strip_prefix(from).unwrap_or(Path::new(""));
                let new = if suffix.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(suffix)
                };
                self.nodes.insert(new, node);
            }
        }
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        match self.nodes.get(path) {
            Some(Node::File(data)) => Ok(data.clone()),
            _ => Err(Self::not_found(path)),
        }
    }

    fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !self.exists(root) {
            return Err(Self::not_found(root));
        }
        Ok(self
            .nodes
            .iter()
            .filter(|(path, node)| path.starts_with(root) && matches!(node, Node::File(_)))
            .map(|(path, _)| path.clone())
            .collect())
    }
}

//! Archive shape detection: which validator a dataset goes through.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ValidationConfig;
use crate::error::{Result, SchemaViolation};
use crate::tree::{FileTree, TreeEntry};

/// Where an archive was extracted, and what to leave out of the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    /// Staging directory the archive was expanded into.
    pub root: PathBuf,
    /// The uploaded archive file itself, when it sits next to the extracted tree.
    pub source_file: Option<String>,
}

impl ArchiveLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            source_file: None,
        }
    }

    /// Skip the uploaded file when scanning the archive root.
    pub fn with_source_file(mut self, name: impl Into<String>) -> Self {
        self.source_file = Some(name.into());
        self
    }

    fn is_source_file(&self, entry: &TreeEntry) -> bool {
        entry.is_file() && self.source_file.as_deref() == Some(entry.name.as_str())
    }
}

/// How a dataset root is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ValidationMode {
    /// Root already holds class folders; validate only.
    Structured { root: PathBuf },
    /// Class identity comes from filenames; normalize, then check counts.
    Flat { root: PathBuf },
}

impl ValidationMode {
    /// The dataset root this mode operates on.
    pub fn root(&self) -> &Path {
        match self {
            ValidationMode::Structured { root } | ValidationMode::Flat { root } => root,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValidationMode::Structured { .. } => "structured",
            ValidationMode::Flat { .. } => "flat",
        }
    }
}

/// Children of `dir` minus ignored clutter.
pub(crate) fn visible_entries<T: FileTree + ?Sized>(
    tree: &T,
    dir: &Path,
    config: &ValidationConfig,
) -> Result<Vec<TreeEntry>> {
    Ok(tree
        .read_dir(dir)?
        .into_iter()
        .filter(|e| !config.is_ignored(&e.name))
        .collect())
}

/// Find the single dataset folder directly under the archive root.
///
/// The root is inferred from the tree shape alone: exactly one directory,
/// and no other files besides the uploaded archive.
pub fn resolve_dataset_root<T: FileTree + ?Sized>(
    tree: &T,
    layout: &ArchiveLayout,
    config: &ValidationConfig,
) -> Result<PathBuf> {
    let entries: Vec<TreeEntry> = visible_entries(tree, &layout.root, config)?
        .into_iter()
        .filter(|e| !layout.is_source_file(e))
        .collect();

    let dirs: Vec<&TreeEntry> = entries.iter().filter(|e| e.is_dir()).collect();
    if dirs.len() != 1 {
        return Err(SchemaViolation::InvalidRootCount {
            path: layout.root.clone(),
            found: dirs.len(),
        }
        .into());
    }
    if let Some(stray) = entries.iter().find(|e| e.is_file()) {
        return Err(SchemaViolation::StrayFile {
            path: layout.root.join(&stray.name),
        }
        .into());
    }

    Ok(layout.root.join(&dirs[0].name))
}

/// Pick structured or flat processing for an extracted archive.
pub fn classify<T: FileTree + ?Sized>(
    tree: &T,
    layout: &ArchiveLayout,
    config: &ValidationConfig,
) -> Result<ValidationMode> {
    let root = resolve_dataset_root(tree, layout, config)?;
    let has_subdir = visible_entries(tree, &root, config)?
        .iter()
        .any(TreeEntry::is_dir);

    let mode = if has_subdir {
        ValidationMode::Structured { root }
    } else {
        ValidationMode::Flat { root }
    };
    debug!(mode = mode.name(), root = %mode.root().display(), "classified archive");
    Ok(mode)
}

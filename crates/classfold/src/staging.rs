//! Per-request scratch directories.
//!
//! Every upload gets its own [`StagingArea`]. The directory is removed when
//! the area is released or dropped, whichever happens first, and the shared
//! [`StagingStats`] counts each area exactly once in both directions.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{ClassfoldError, Result};

/// Counters shared by every staging area created from the same source.
#[derive(Debug, Clone, Default)]
pub struct StagingStats {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl StagingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Areas acquired but not yet released.
    pub fn outstanding(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }
}

/// A scratch directory owned by a single request.
#[derive(Debug)]
pub struct StagingArea {
    dir: Option<TempDir>,
    path: PathBuf,
    stats: StagingStats,
}

impl StagingArea {
    /// Create a fresh directory under `parent`, or the system temp dir.
    pub fn acquire(stats: &StagingStats, parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("classfold-");
        let dir = match parent {
            Some(parent) => builder
                .tempdir_in(parent)
                .map_err(|e| ClassfoldError::io(parent, e))?,
            None => builder
                .tempdir()
                .map_err(|e| ClassfoldError::io(std::env::temp_dir(), e))?,
        };

        stats.acquired.fetch_add(1, Ordering::SeqCst);
        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "staging area acquired");
        Ok(Self {
            dir: Some(dir),
            path,
            stats: stats.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the uploaded bytes into the area. Only the final path component
    /// of `name` is used. Returns the written path.
    pub fn write_payload(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| ClassfoldError::UnsupportedArchive(name.to_string()))?;
        let target = self.path.join(file_name);
        fs::write(&target, bytes).map_err(|e| ClassfoldError::io(&target, e))?;
        Ok(target)
    }

    /// Remove the directory now and report any cleanup failure.
    pub fn release(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        debug!(path = %self.path.display(), "staging area released");
        dir.close().map_err(|e| ClassfoldError::io(&self.path, e))
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!(error = %e, "failed to remove staging area");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_removes_directory() {
        let stats = StagingStats::new();
        let area = StagingArea::acquire(&stats, None).unwrap();
        let path = area.path().to_path_buf();
        area.write_payload("upload.zip", b"PK").unwrap();
        assert!(path.join("upload.zip").is_file());
        assert_eq!(stats.outstanding(), 1);

        area.release().unwrap();
        assert!(!path.exists());
        assert_eq!(stats.acquired(), 1);
        assert_eq!(stats.released(), 1);
    }

    #[test]
    fn test_drop_releases_once() {
        let stats = StagingStats::new();
        let path = {
            let area = StagingArea::acquire(&stats, None).unwrap();
            area.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(stats.released(), 1);
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn test_payload_name_cannot_escape() {
        let parent = TempDir::new().unwrap();
        let stats = StagingStats::new();
        let area = StagingArea::acquire(&stats, Some(parent.path())).unwrap();
        let written = area.write_payload("../../evil.zip", b"PK").unwrap();
        assert_eq!(written, area.path().join("evil.zip"));
        assert!(area.path().starts_with(parent.path()));
    }
}

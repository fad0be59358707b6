//! Zip extraction into a staging area, and zip packing for downloads.

use std::fs::{self, File};
use std::io::{self, Cursor, Write};
use std::path::Path;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ClassfoldError, Result};

/// Refuse anything that is not named `*.zip`.
pub fn ensure_zip_name(file_name: &str) -> Result<()> {
    if file_name.ends_with(".zip") {
        Ok(())
    } else {
        Err(ClassfoldError::UnsupportedArchive(file_name.to_string()))
    }
}

/// Expand `archive` into `dest`. Returns the number of files written.
///
/// Entries whose path would land outside `dest` (absolute paths, `..`) abort
/// the extraction.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive).map_err(|e| ClassfoldError::io(archive, e))?;
    let mut zip = ZipArchive::new(file)?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ClassfoldError::UnsafeArchiveEntry(entry.name().to_string()))?;
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| ClassfoldError::io(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ClassfoldError::io(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| ClassfoldError::io(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| ClassfoldError::io(&target, e))?;
        written += 1;
    }

    debug!(archive = %archive.display(), files = written, "archive extracted");
    Ok(written)
}

/// Builds a deflated zip in memory, one stored object at a time.
pub struct ZipExport {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    entries: usize,
}

impl Default for ZipExport {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipExport {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            entries: 0,
        }
    }

    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer
            .start_file(name, options)
            .map_err(ClassfoldError::Export)?;
        self.writer
            .write_all(data)
            .map_err(|e| ClassfoldError::io(name, e))?;
        self.entries += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Finish the central directory and return the archive bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        let cursor = self.writer.finish().map_err(ClassfoldError::Export)?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_zip_name_check() {
        assert!(ensure_zip_name("data.zip").is_ok());
        assert!(matches!(
            ensure_zip_name("data.tar.gz"),
            Err(ClassfoldError::UnsupportedArchive(_))
        ));
        // Suffix match is exact.
        assert!(ensure_zip_name("data.ZIP").is_err());
    }

    #[test]
    fn test_extracts_nested_tree() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("up.zip");
        write_zip(
            &archive,
            &[("ds/", b""), ("ds/A/1.png", b"a"), ("ds/B/1.png", b"b")],
        );
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        assert_eq!(extract_zip(&archive, &dest).unwrap(), 2);
        assert_eq!(fs::read(dest.join("ds/A/1.png")).unwrap(), b"a");
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(&archive, &[("../outside.png", b"x")]);
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let err = extract_zip(&archive, &dest).unwrap_err();
        assert!(matches!(err, ClassfoldError::UnsafeArchiveEntry(ref name) if name == "../outside.png"));
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
        assert!(!dir.path().join("outside.png").exists());
    }

    #[test]
    fn test_garbage_is_archive_error() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("bad.zip");
        fs::write(&archive, b"not a zip").unwrap();
        assert!(matches!(
            extract_zip(&archive, dir.path()),
            Err(ClassfoldError::Archive(_))
        ));
    }

    #[test]
    fn test_export_extracts_back() {
        let mut export = ZipExport::new();
        assert!(export.is_empty());
        export.add_file("ds/A/01.png", b"one").unwrap();
        export.add_file("ds/B/01.png", b"two").unwrap();
        assert_eq!(export.len(), 2);

        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("export.zip");
        fs::write(&archive, export.finish().unwrap()).unwrap();
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        assert_eq!(extract_zip(&archive, &dest).unwrap(), 2);
        assert_eq!(fs::read(dest.join("ds/B/01.png")).unwrap(), b"two");
    }
}

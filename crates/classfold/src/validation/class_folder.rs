//! Validation of a single class folder: extensions, index completeness, count.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::{accepted_extensions, MAX_FILES_PER_CLASS};
use crate::error::SchemaViolation;
use crate::pattern::FileEntry;

/// Checks one class folder against the expected sample numbering `1..=N`.
#[derive(Debug, Clone, Copy)]
pub struct ClassFolderValidator {
    expected_files_per_class: usize,
}

impl ClassFolderValidator {
    pub fn new(expected_files_per_class: usize) -> Self {
        Self {
            expected_files_per_class,
        }
    }

    /// Validate the file names found in `folder`. Returns the file count.
    ///
    /// Checks run in a fixed order and the first failure wins: empty folder,
    /// extension, missing indices, duplicate indices, total count. Indices
    /// outside `1..=N` are not an error on their own but still count toward
    /// the total.
    pub fn validate(&self, folder: &Path, files: &[String]) -> Result<usize, SchemaViolation> {
        if files.is_empty() {
            return Err(SchemaViolation::EmptyClassFolder {
                path: folder.to_path_buf(),
            });
        }

        let mut sorted: Vec<&String> = files.iter().collect();
        sorted.sort();

        let expected = self.expected_files_per_class as u64;
        let mut by_index: BTreeMap<u64, Vec<String>> = BTreeMap::new();

        for file in sorted {
            let entry = FileEntry::parse(file);
            if !entry.has_valid_extension() {
                return Err(SchemaViolation::InvalidImageExtension {
                    path: folder.to_path_buf(),
                    file: file.clone(),
                    accepted: accepted_extensions(),
                });
            }
            if let Some(index) = entry.plain_index() {
                if (1..=expected).contains(&index) {
                    by_index.entry(index).or_default().push(file.clone());
                }
            }
        }

        // Indices past four digits cannot be named, so they are never listed.
        let nameable = expected.min(MAX_FILES_PER_CLASS as u64);
        let found: BTreeSet<u64> = by_index.keys().copied().collect();
        let missing: Vec<u64> = (1..=nameable).filter(|i| !found.contains(i)).collect();
        if !missing.is_empty() {
            return Err(SchemaViolation::MissingIndices {
                path: folder.to_path_buf(),
                missing,
            });
        }

        if let Some((index, names)) = by_index.iter().find(|(_, names)| names.len() > 1) {
            return Err(SchemaViolation::DuplicateIndex {
                path: folder.to_path_buf(),
                class: class_name(folder),
                index: *index,
                files: names.clone(),
            });
        }

        if files.len() != self.expected_files_per_class {
            return Err(SchemaViolation::FileCountMismatch {
                path: folder.to_path_buf(),
                class: class_name(folder),
                found: files.len(),
                expected: self.expected_files_per_class,
            });
        }

        Ok(files.len())
    }
}

/// The class a folder stands for: its last path component.
pub(crate) fn class_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

//! Validation of archives that already have the `root/class/file` shape.

use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use crate::classifier::{resolve_dataset_root, visible_entries, ArchiveLayout};
use crate::config::ValidationConfig;
use crate::error::{Result, SchemaViolation};
use crate::tree::FileTree;

use super::class_folder::{class_name, ClassFolderValidator};

/// Validates a dataset root holding one folder per class.
pub struct StructuredValidator<'a> {
    config: &'a ValidationConfig,
}

impl<'a> StructuredValidator<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    /// Resolve the single dataset root under the archive, then validate it.
    pub fn validate_archive<T: FileTree + ?Sized>(
        &self,
        tree: &T,
        layout: &ArchiveLayout,
    ) -> Result<IndexMap<String, usize>> {
        let root = resolve_dataset_root(tree, layout, self.config)?;
        self.validate(tree, &root)
    }

    /// Validate every class folder under `root`. Returns class name → file count.
    ///
    /// Stops at the first violation. Class folders are visited in name order.
    pub fn validate<T: FileTree + ?Sized>(
        &self,
        tree: &T,
        root: &Path,
    ) -> Result<IndexMap<String, usize>> {
        let entries = visible_entries(tree, root, self.config)?;

        if let Some(stray) = entries.iter().find(|e| e.is_file()) {
            return Err(SchemaViolation::StrayFile {
                path: root.join(&stray.name),
            }
            .into());
        }
        if entries.is_empty() {
            return Err(SchemaViolation::NoClassFolders {
                path: root.to_path_buf(),
            }
            .into());
        }

        let folder_validator = ClassFolderValidator::new(self.config.expected_files_per_class);
        let mut classes = IndexMap::new();

        for entry in &entries {
            let folder = root.join(&entry.name);
            let children = visible_entries(tree, &folder, self.config)?;

            if let Some(sub) = children.iter().find(|c| c.is_dir()) {
                return Err(SchemaViolation::UnexpectedSubfolder {
                    path: folder.clone(),
                    subfolder: sub.name.clone(),
                }
                .into());
            }

            let files: Vec<String> = children.into_iter().map(|c| c.name).collect();
            let count = folder_validator.validate(&folder, &files)?;
            debug!(class = %entry.name, files = count, "class folder valid");
            classes.insert(class_name(&folder), count);
        }

        if classes.len() != self.config.expected_num_classes {
            return Err(SchemaViolation::ClassCountMismatch {
                path: root.to_path_buf(),
                found: classes.len(),
                expected: self.config.expected_num_classes,
            }
            .into());
        }

        Ok(classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassfoldError;
    use crate::tree::MemoryTree;

    fn dataset(classes: &[&str], files: usize) -> MemoryTree {
        let mut tree = MemoryTree::new();
        for class in classes {
            for i in 1..=files {
                tree.add_file(format!("ds/{}/{}.png", class, i), "px");
            }
        }
        tree
    }

    fn config(classes: usize, files: usize) -> ValidationConfig {
        ValidationConfig::new(classes, files).unwrap()
    }

    fn violation(err: ClassfoldError) -> SchemaViolation {
        match err {
            ClassfoldError::Schema(v) => v,
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_dataset_returns_classes() {
        let tree = dataset(&["A", "B", "C", "D"], 5);
        let config = config(4, 5);
        let classes = StructuredValidator::new(&config)
            .validate(&tree, Path::new("ds"))
            .unwrap();

        assert_eq!(classes.keys().collect::<Vec<_>>(), vec!["A", "B", "C", "D"]);
        assert!(classes.values().all(|&n| n == 5));
    }

    #[test]
    fn test_class_count_mismatch() {
        let tree = dataset(&["A", "B", "C"], 2);
        let config = config(4, 2);
        let err = StructuredValidator::new(&config)
            .validate(&tree, Path::new("ds"))
            .unwrap_err();

        assert_eq!(
            violation(err),
            SchemaViolation::ClassCountMismatch {
                path: "ds".into(),
                found: 3,
                expected: 4,
            }
        );
    }

    #[test]
    fn test_nested_subfolder_rejected() {
        let mut tree = dataset(&["A"], 1);
        tree.add_file("ds/A/deeper/1.png", "px");
        let config = config(1, 1);
        let err = StructuredValidator::new(&config)
            .validate(&tree, Path::new("ds"))
            .unwrap_err();

        assert!(matches!(
            violation(err),
            SchemaViolation::UnexpectedSubfolder { subfolder, .. } if subfolder == "deeper"
        ));
    }

    #[test]
    fn test_empty_root_has_no_class_folders() {
        let mut tree = MemoryTree::new();
        tree.add_dir("ds");
        let config = config(1, 1);
        let err = StructuredValidator::new(&config)
            .validate(&tree, Path::new("ds"))
            .unwrap_err();

        assert!(matches!(violation(err), SchemaViolation::NoClassFolders { .. }));
    }

    #[test]
    fn test_file_next_to_class_folders_rejected() {
        let mut tree = dataset(&["A"], 1);
        tree.add_file("ds/labels.csv", "a,b");
        let config = config(1, 1);
        let err = StructuredValidator::new(&config)
            .validate(&tree, Path::new("ds"))
            .unwrap_err();

        assert!(matches!(violation(err), SchemaViolation::StrayFile { .. }));
    }

    #[test]
    fn test_empty_class_folder_rejected() {
        let mut tree = dataset(&["A"], 1);
        tree.add_dir("ds/B");
        let config = config(2, 1);
        let err = StructuredValidator::new(&config)
            .validate(&tree, Path::new("ds"))
            .unwrap_err();

        assert!(matches!(violation(err), SchemaViolation::EmptyClassFolder { .. }));
    }

    #[test]
    fn test_validate_archive_resolves_root() {
        let mut tree = MemoryTree::new();
        tree.add_file("stage/upload.zip", "zip");
        for class in ["A", "B"] {
            for i in 1..=2 {
                tree.add_file(format!("stage/ds/{}/{}.png", class, i), "px");
            }
        }
        let layout = ArchiveLayout::new("stage").with_source_file("upload.zip");
        let config = config(2, 2);

        let classes = StructuredValidator::new(&config)
            .validate_archive(&tree, &layout)
            .unwrap();
        assert_eq!(classes.len(), 2);
    }
}

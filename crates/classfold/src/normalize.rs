//! Flat-mode normalization: regroup files whose names carry their class.
//!
//! Normalization runs in three phases so the only mutation of the staging
//! tree is isolated and happens last:
//!
//! 1. [`NormalizationPlan::build`] walks the working root read-only, parses
//!    every filename and records where each file must end up.
//! 2. [`NormalizationPlan::verify`] checks class and file counts on the plan.
//! 3. [`NormalizationPlan::apply`] creates class folders and moves files.
//!
//! A failure in the first two phases leaves the tree untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::classifier::visible_entries;
use crate::config::{accepted_extensions, ValidationConfig};
use crate::error::{Result, SchemaViolation};
use crate::pattern::{FileEntry, FilenameKind, ANY_FORMAT, CLASS_QUALIFIED_FORMAT};
use crate::tree::FileTree;

/// Where a planned file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Inside a folder one level below the root; the folder names the class.
    Grouped,
    /// Directly under the root; the filename names the class.
    Loose,
}

/// One file and its place in the canonical layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFile {
    /// Current location.
    pub source: PathBuf,
    /// `<index><ext>` inside the class folder.
    pub canonical_name: String,
    /// Numeric sample index.
    pub index: u64,
    /// Grouped or loose.
    pub origin: Origin,
}

/// What [`NormalizationPlan::apply`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeOutcome {
    /// Files renamed in place inside their folder.
    pub renamed: usize,
    /// Loose files moved into a class folder.
    pub moved: usize,
}

/// Class id → files, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizationPlan {
    root: PathBuf,
    classes: IndexMap<String, Vec<PlannedFile>>,
}

impl NormalizationPlan {
    /// Walk `root` and plan the canonical layout.
    ///
    /// Folders directly under `root` are pre-grouped classes: the folder name
    /// is the class, files may be bare (`07.png`) or class-qualified with the
    /// same class (`A_07.png`). Files directly under `root` must be
    /// class-qualified.
    pub fn build<T: FileTree + ?Sized>(
        tree: &T,
        root: &Path,
        config: &ValidationConfig,
    ) -> Result<Self> {
        let mut plan = Self {
            root: root.to_path_buf(),
            classes: IndexMap::new(),
        };

        let entries = visible_entries(tree, root, config)?;
        let (folders, loose): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| e.is_dir());

        for folder in &folders {
            plan.plan_grouped_folder(tree, &root.join(&folder.name), &folder.name, config)?;
        }
        for file in &loose {
            plan.plan_loose_file(&file.name)?;
        }

        debug!(
            root = %root.display(),
            classes = plan.classes.len(),
            files = plan.total_files(),
            "normalization planned"
        );
        Ok(plan)
    }

    fn plan_grouped_folder<T: FileTree + ?Sized>(
        &mut self,
        tree: &T,
        folder: &Path,
        class: &str,
        config: &ValidationConfig,
    ) -> Result<()> {
        let children = visible_entries(tree, folder, config)?;
        if let Some(sub) = children.iter().find(|c| c.is_dir()) {
            return Err(SchemaViolation::UnexpectedSubfolder {
                path: folder.to_path_buf(),
                subfolder: sub.name.clone(),
            }
            .into());
        }

        if children.is_empty() {
            return Err(SchemaViolation::EmptyClassFolder {
                path: folder.to_path_buf(),
            }
            .into());
        }

        for child in children {
            let entry = FileEntry::parse(&child.name);
            check_extension(folder, &entry)?;

            let index = match &entry.kind {
                FilenameKind::ClassQualified { class_id, index } => {
                    if class_id != class {
                        return Err(SchemaViolation::ClassTokenMismatch {
                            path: folder.join(&entry.file_name),
                            file: entry.file_name.clone(),
                            folder_class: class.to_string(),
                            parsed_class: class_id.clone(),
                        }
                        .into());
                    }
                    index
                }
                FilenameKind::Bare { index } => index,
                FilenameKind::Unrecognized => {
                    return Err(SchemaViolation::UnrecognizedFilename {
                        path: folder.to_path_buf(),
                        file: entry.file_name.clone(),
                        expected: ANY_FORMAT,
                    }
                    .into());
                }
            };

            self.push(
                class,
                PlannedFile {
                    source: folder.join(&entry.file_name),
                    canonical_name: format!("{}{}", index.digits, entry.extension),
                    index: index.value,
                    origin: Origin::Grouped,
                },
            );
        }
        Ok(())
    }

    fn plan_loose_file(&mut self, name: &str) -> Result<()> {
        let entry = FileEntry::parse(name);
        check_extension(&self.root, &entry)?;

        match &entry.kind {
            FilenameKind::ClassQualified { class_id, index } => {
                let planned = PlannedFile {
                    source: self.root.join(&entry.file_name),
                    canonical_name: format!("{}{}", index.digits, entry.extension),
                    index: index.value,
                    origin: Origin::Loose,
                };
                self.push(class_id, planned);
                Ok(())
            }
            // Without a containing folder a bare index has no class.
            FilenameKind::Bare { .. } | FilenameKind::Unrecognized => {
                Err(SchemaViolation::UnrecognizedFilename {
                    path: self.root.clone(),
                    file: entry.file_name.clone(),
                    expected: CLASS_QUALIFIED_FORMAT,
                }
                .into())
            }
        }
    }

    fn push(&mut self, class: &str, file: PlannedFile) {
        self.classes.entry(class.to_string()).or_default().push(file);
    }

    /// The working root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Planned files per class.
    pub fn classes(&self) -> &IndexMap<String, Vec<PlannedFile>> {
        &self.classes
    }

    /// Number of files per class.
    pub fn class_counts(&self) -> IndexMap<String, usize> {
        self.classes
            .iter()
            .map(|(class, files)| (class.clone(), files.len()))
            .collect()
    }

    pub fn total_files(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    /// Final location of a planned file.
    pub fn target_path(&self, class: &str, file: &PlannedFile) -> PathBuf {
        self.root.join(class).join(&file.canonical_name)
    }

    /// Check class count, duplicate indices and per-class file counts.
    pub fn verify(&self, config: &ValidationConfig) -> std::result::Result<(), SchemaViolation> {
        if self.classes.len() != config.expected_num_classes {
            return Err(SchemaViolation::ClassCountMismatch {
                path: self.root.clone(),
                found: self.classes.len(),
                expected: config.expected_num_classes,
            });
        }

        for (class, files) in &self.classes {
            let mut by_index: BTreeMap<u64, Vec<String>> = BTreeMap::new();
            for file in files {
                by_index
                    .entry(file.index)
                    .or_default()
                    .push(display_name(&file.source));
            }
            if let Some((index, names)) = by_index.into_iter().find(|(_, n)| n.len() > 1) {
                return Err(SchemaViolation::DuplicateIndex {
                    path: self.root.join(class),
                    class: class.clone(),
                    index,
                    files: names,
                });
            }

            if files.len() != config.expected_files_per_class {
                return Err(SchemaViolation::FileCountMismatch {
                    path: self.root.join(class),
                    class: class.clone(),
                    found: files.len(),
                    expected: config.expected_files_per_class,
                });
            }
        }
        Ok(())
    }

    /// Create class folders and move every file to its canonical name.
    pub fn apply<T: FileTree + ?Sized>(&self, tree: &mut T) -> Result<NormalizeOutcome> {
        let mut outcome = NormalizeOutcome::default();

        for (class, files) in &self.classes {
            let class_dir = self.root.join(class);
            if !tree.exists(&class_dir) {
                tree.create_dir_all(&class_dir)?;
            }
            for file in files {
                let target = self.target_path(class, file);
                if target == file.source {
                    continue;
                }
                tree.rename(&file.source, &target)?;
                match file.origin {
                    Origin::Grouped => outcome.renamed += 1,
                    Origin::Loose => outcome.moved += 1,
                }
            }
        }

        info!(
            root = %self.root.display(),
            renamed = outcome.renamed,
            moved = outcome.moved,
            "flat dataset normalized"
        );
        Ok(outcome)
    }
}

fn check_extension(dir: &Path, entry: &FileEntry) -> std::result::Result<(), SchemaViolation> {
    if entry.has_valid_extension() {
        Ok(())
    } else {
        Err(SchemaViolation::InvalidImageExtension {
            path: dir.to_path_buf(),
            file: entry.file_name.clone(),
            accepted: accepted_extensions(),
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Plan, verify and apply in one call.
pub struct FlatNormalizer<'a> {
    config: &'a ValidationConfig,
}

impl<'a> FlatNormalizer<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    /// Normalize `root` in place. Returns class → file count and what moved.
    pub fn normalize<T: FileTree + ?Sized>(
        &self,
        tree: &mut T,
        root: &Path,
    ) -> Result<(IndexMap<String, usize>, NormalizeOutcome)> {
        let plan = NormalizationPlan::build(&*tree, root, self.config)?;
        plan.verify(self.config)?;
        let outcome = plan.apply(tree)?;
        Ok((plan.class_counts(), outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassfoldError;
    use crate::tree::MemoryTree;

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
    fn test_loose_files_grouped_by_class() {
        let mut tree = MemoryTree::new();
        tree.add_file("ds/A_01.png", "a1")
            .add_file("ds/A 02.jpg", "a2")
            .add_file("ds/B-01.png", "b1")
            .add_file("ds/B_02.png", "b2");

        let config = config(2, 2);
        let (counts, outcome) = FlatNormalizer::new(&config)
            .normalize(&mut tree, Path::new("ds"))
            .unwrap();

        assert_eq!(counts.get("A"), Some(&2));
        assert_eq!(counts.get("B"), Some(&2));
        assert_eq!(outcome, NormalizeOutcome { renamed: 0, moved: 4 });
        assert_eq!(
            tree.files(),
            vec![
                PathBuf::from("ds/A/01.png"),
                PathBuf::from("ds/A/02.jpg"),
                PathBuf::from("ds/B/01.png"),
                PathBuf::from("ds/B/02.png"),
            ]
        );
        assert_eq!(tree.read_file(Path::new("ds/A/02.jpg")).unwrap(), b"a2");
    }

    #[test]
    fn test_loose_file_creates_new_class() {
        let mut tree = MemoryTree::new();
        tree.add_file("ds/B_001.png", "b");

        let config = config(1, 1);
        FlatNormalizer::new(&config)
            .normalize(&mut tree, Path::new("ds"))
            .unwrap();
        assert!(tree.is_file("ds/B/001.png"));
    }

    #[test]
    fn test_grouped_file_with_foreign_token_rejected() {
        let mut tree = MemoryTree::new();
        tree.add_file("ds/C/B_001.png", "b");

        let config = config(1, 1);
        let err = FlatNormalizer::new(&config)
            .normalize(&mut tree, Path::new("ds"))
            .unwrap_err();

        match violation(err) {
            SchemaViolation::ClassTokenMismatch {
                file,
                folder_class,
                parsed_class,
                ..
            } => {
                assert_eq!(file, "B_001.png");
                assert_eq!(folder_class, "C");
                assert_eq!(parsed_class, "B");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(tree.is_file("ds/C/B_001.png"));
    }

    #[test]
    fn test_grouped_files_renamed_in_place() {
        let mut tree = MemoryTree::new();
        tree.add_file("ds/C/C_01.png", "c1").add_file("ds/C/02.png", "c2");

        let config = config(1, 2);
        let (_, outcome) = FlatNormalizer::new(&config)
            .normalize(&mut tree, Path::new("ds"))
            .unwrap();

        assert_eq!(outcome, NormalizeOutcome { renamed: 1, moved: 0 });
        assert_eq!(
            tree.files(),
            vec![PathBuf::from("ds/C/01.png"), PathBuf::from("ds/C/02.png")]
        );
    }

    #[test]
    fn test_bare_loose_file_rejected() {
        let mut tree = MemoryTree::new();
        tree.add_file("ds/01.png", "x");

        let config = config(1, 1);
        let err = FlatNormalizer::new(&config)
            .normalize(&mut tree, Path::new("ds"))
            .unwrap_err();
        assert!(matches!(
            violation(err),
            SchemaViolation::UnrecognizedFilename { file, .. } if file == "01.png"
        ));
    }

    #[test]
    fn test_unrecognized_name_in_group_rejected() {
        let mut tree = MemoryTree::new();
        tree.add_file("ds/A/photo.png", "x");

        let config = config(1, 1);
        let err = FlatNormalizer::new(&config)
            .normalize(&mut tree, Path::new("ds"))
            .unwrap_err();
        assert!(matches!(
            violation(err),
            SchemaViolation::UnrecognizedFilename { .. }
        ));
    }

    #[test]
    fn test_non_image_rejected_in_flat_mode() {
        let mut tree = MemoryTree::new();
        tree.add_file("ds/A_01.txt", "x");

        let config = config(1, 1);
        let err = FlatNormalizer::new(&config)
            .normalize(&mut tree, Path::new("ds"))
            .unwrap_err();
        assert!(matches!(
            violation(err),
            SchemaViolation::InvalidImageExtension { .. }
        ));
    }

    #[test]
    fn test_count_failures_leave_tree_untouched() {
        let mut tree = MemoryTree::new();
        tree.add_file("ds/A_01.png", "a").add_file("ds/B_01.png", "b");
        let before = tree.files();

        let config = config(3, 1);
        let err = FlatNormalizer::new(&config)
            .normalize(&mut tree, Path::new("ds"))
            .unwrap_err();

        assert_eq!(
            violation(err),
            SchemaViolation::ClassCountMismatch {
                path: "ds".into(),
                found: 2,
                expected: 3,
            }
        );
        assert_eq!(tree.files(), before);
    }

    #[test]
    fn test_file_count_mismatch() {
        let mut tree = MemoryTree::new();
        tree.add_file("ds/A_01.png", "a")
            .add_file("ds/A_02.png", "a")
            .add_file("ds/B_01.png", "b");

        let config = config(2, 2);
        let err = FlatNormalizer::new(&config)
            .normalize(&mut tree, Path::new("ds"))
            .unwrap_err();
        assert_eq!(
            violation(err),
            SchemaViolation::FileCountMismatch {
                path: "ds/B".into(),
                class: "B".into(),
                found: 1,
                expected: 2,
            }
        );
    }

    #[test]
    fn test_colliding_indices_rejected_before_any_move() {
        let mut tree = MemoryTree::new();
        tree.add_file("ds/A_01.png", "one")
            .add_file("ds/A 01.png", "two");

        let config = config(1, 2);
        let err = FlatNormalizer::new(&config)
            .normalize(&mut tree, Path::new("ds"))
            .unwrap_err();

        assert!(matches!(
            violation(err),
            SchemaViolation::DuplicateIndex { index: 1, .. }
        ));
        assert!(tree.is_file("ds/A_01.png"));
        assert!(tree.is_file("ds/A 01.png"));
    }

    #[test]
    fn test_loose_file_joins_existing_group() {
        let mut tree = MemoryTree::new();
        tree.add_file("ds/A/01.png", "a1").add_file("ds/A_02.png", "a2");

        let plan = NormalizationPlan::build(&tree, Path::new("ds"), &config(1, 2)).unwrap();
        assert_eq!(plan.class_counts().get("A"), Some(&2));
        let targets: Vec<PathBuf> = plan.classes()["A"]
            .iter()
            .map(|f| plan.target_path("A", f))
            .collect();
        assert_eq!(
            targets,
            vec![PathBuf::from("ds/A/01.png"), PathBuf::from("ds/A/02.png")]
        );
    }
}

//! Validation parameters supplied per upload.

use serde::{Deserialize, Serialize};

use crate::error::{ClassfoldError, Result};

/// Image extensions accepted inside a dataset. Comparison is case-sensitive.
pub const VALID_IMAGE_EXTENSIONS: &[&str] = &[".bmp", ".jpg", ".jpeg", ".png", ".gif"];

/// Number of classes expected when the caller does not say.
pub const DEFAULT_NUM_CLASSES: usize = 4;

/// Number of files per class expected when the caller does not say.
pub const DEFAULT_FILES_PER_CLASS: usize = 200;

/// Largest files-per-class count a dataset can satisfy: sample indices are at
/// most four digits.
pub const MAX_FILES_PER_CLASS: usize = 9999;

/// Archive clutter skipped at every level of the walk.
pub const DEFAULT_IGNORED_ENTRIES: &[&str] = &["__MACOSX", ".DS_Store", "Thumbs.db"];

/// Immutable per-call validation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// How many class folders the dataset must end up with.
    pub expected_num_classes: usize,
    /// How many files every class must hold, numbered `1..=N`.
    pub expected_files_per_class: usize,
    /// Entry names that are neither validated nor uploaded.
    pub ignored_entries: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            expected_num_classes: DEFAULT_NUM_CLASSES,
            expected_files_per_class: DEFAULT_FILES_PER_CLASS,
            ignored_entries: DEFAULT_IGNORED_ENTRIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ValidationConfig {
    /// Create a config with explicit counts, rejecting zeros.
    pub fn new(expected_num_classes: usize, expected_files_per_class: usize) -> Result<Self> {
        let config = Self {
            expected_num_classes,
            expected_files_per_class,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the expected class count.
    pub fn with_num_classes(mut self, n: usize) -> Self {
        self.expected_num_classes = n;
        self
    }

    /// Replace the expected files-per-class count.
    pub fn with_files_per_class(mut self, n: usize) -> Self {
        self.expected_files_per_class = n;
        self
    }

    /// Replace the ignored entry names.
    pub fn with_ignored_entries<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_entries = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Check that both counts are at least one and the file count fits the
    /// four-digit index range.
    pub fn validate(&self) -> Result<()> {
        if self.expected_num_classes == 0 {
            return Err(ClassfoldError::Config(
                "expected_num_classes must be at least 1".into(),
            ));
        }
        if self.expected_files_per_class == 0 {
            return Err(ClassfoldError::Config(
                "expected_files_per_class must be at least 1".into(),
            ));
        }
        if self.expected_files_per_class > MAX_FILES_PER_CLASS {
            return Err(ClassfoldError::Config(format!(
                "expected_files_per_class must be at most {}, got {}",
                MAX_FILES_PER_CLASS, self.expected_files_per_class
            )));
        }
        Ok(())
    }

    /// Whether an entry with this name is skipped.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_entries.iter().any(|e| e == name)
    }
}

/// The accepted extensions joined for error messages.
pub fn accepted_extensions() -> String {
    VALID_IMAGE_EXTENSIONS.join(", ")
}

//! Main validator struct and public API.

use std::path::Path;

use tracing::{info, warn};

use crate::classifier::{classify, ArchiveLayout, ValidationMode};
use crate::config::ValidationConfig;
use crate::error::Result;
use crate::normalize::FlatNormalizer;
use crate::report::ValidationReport;
use crate::tree::{FileTree, LocalTree};
use crate::validation::StructuredValidator;

/// Outcome of one validation run: the report, or why the archive was refused.
pub type ValidationVerdict = Result<ValidationReport>;

/// Classifies an extracted archive and runs the matching validator.
#[derive(Debug, Clone, Default)]
pub struct DatasetValidator {
    config: ValidationConfig,
}

impl DatasetValidator {
    /// Create a validator with default configuration (4 classes, 200 files).
    pub fn new() -> Self {
        Self::with_config(ValidationConfig::default())
    }

    /// Create a validator with custom configuration.
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Decide how the archive under `layout` is processed, without validating.
    pub fn classify<T: FileTree + ?Sized>(
        &self,
        tree: &T,
        layout: &ArchiveLayout,
    ) -> Result<ValidationMode> {
        classify(tree, layout, &self.config)
    }

    /// Validate an extracted archive.
    ///
    /// Structured archives are only read. Flat archives are regrouped in place
    /// into `class/index.ext`, so on success the dataset root is canonical
    /// whichever mode it entered with.
    pub fn validate<T: FileTree + ?Sized>(
        &self,
        tree: &mut T,
        layout: &ArchiveLayout,
    ) -> ValidationVerdict {
        self.config.validate()?;

        let verdict = self.run(tree, layout);
        match &verdict {
            Ok(report) => info!("{}", report.summary()),
            Err(e) => warn!(root = %layout.root.display(), error = %e, "archive rejected"),
        }
        verdict
    }

    fn run<T: FileTree + ?Sized>(&self, tree: &mut T, layout: &ArchiveLayout) -> ValidationVerdict {
        let mode = classify(&*tree, layout, &self.config)?;

        match &mode {
            ValidationMode::Structured { root } => {
                let classes = StructuredValidator::new(&self.config).validate(&*tree, root)?;
                Ok(ValidationReport::new(mode, classes))
            }
            ValidationMode::Flat { root } => {
                let (classes, outcome) = FlatNormalizer::new(&self.config).normalize(tree, root)?;
                Ok(ValidationReport::new(mode, classes)
                    .with_changes(outcome.renamed, outcome.moved))
            }
        }
    }

    /// Validate an already-extracted directory on the local filesystem.
    pub fn validate_dir(&self, dir: impl AsRef<Path>) -> ValidationVerdict {
        let layout = ArchiveLayout::new(dir.as_ref());
        self.validate(&mut LocalTree::new(), &layout)
    }
}

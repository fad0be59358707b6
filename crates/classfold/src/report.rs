//! Success verdict of a validation run.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classifier::ValidationMode;
use crate::error::{ClassfoldError, Result};

/// What a successful validation found. Produced fresh per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Mode the dataset went through, with its root.
    #[serde(flatten)]
    pub mode: ValidationMode,
    /// Dataset folder name.
    pub dataset: String,
    /// Class name → file count, sorted by class name.
    pub classes: IndexMap<String, usize>,
    /// Sum of all class counts.
    pub total_files: usize,
    /// Files renamed in place (flat mode only).
    pub files_renamed: usize,
    /// Loose files moved into class folders (flat mode only).
    pub files_moved: usize,
    /// When validation finished.
    pub validated_at: DateTime<Utc>,
}

impl ValidationReport {
    /// Build a report, sorting classes by name.
    pub fn new(mode: ValidationMode, mut classes: IndexMap<String, usize>) -> Self {
        classes.sort_keys();
        let dataset = dataset_name(mode.root());
        let total_files = classes.values().sum();
        Self {
            mode,
            dataset,
            classes,
            total_files,
            files_renamed: 0,
            files_moved: 0,
            validated_at: Utc::now(),
        }
    }

    /// Record what normalization did.
    pub fn with_changes(mut self, renamed: usize, moved: usize) -> Self {
        self.files_renamed = renamed;
        self.files_moved = moved;
        self
    }

    /// Class names in report order.
    pub fn class_names(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }

    /// One-line summary for logs and terminals.
    pub fn summary(&self) -> String {
        format!(
            "{} dataset '{}': {} classes, {} files ({} renamed, {} moved)",
            self.mode.name(),
            self.dataset,
            self.classes.len(),
            self.total_files,
            self.files_renamed,
            self.files_moved
        )
    }

    /// Write `class,files` rows.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["class", "files"])?;
        for (class, count) in &self.classes {
            csv.write_record([class.as_str(), count.to_string().as_str()])?;
        }
        csv.flush()
            .map_err(|e| ClassfoldError::io("<csv output>", e))?;
        Ok(())
    }
}

fn dataset_name(root: &Path) -> String {
    root.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

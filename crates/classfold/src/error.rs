//! Error types for the classfold library.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::storage::StorageError;

/// A structural defect in a caller-supplied dataset archive.
///
/// Every variant names the offending path so the message can be shown to the
/// uploader as-is. None of these are transient: retrying the same archive
/// always yields the same violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// The archive root does not hold exactly one dataset folder.
    #[error("There should be exactly one top-level dataset folder in '{path}', but found {found}.")]
    InvalidRootCount { path: PathBuf, found: usize },

    /// The dataset folder has no class folders.
    #[error("The dataset folder '{path}' must contain class folders.")]
    NoClassFolders { path: PathBuf },

    /// A file sits where only folders are allowed.
    #[error("File '{path}' is not inside a class folder; only folders are allowed at this level.")]
    StrayFile { path: PathBuf },

    /// A class folder contains a nested folder.
    #[error("Class folder '{path}' contains subfolder '{subfolder}', which is not allowed.")]
    UnexpectedSubfolder { path: PathBuf, subfolder: String },

    /// A class folder has no files at all.
    #[error("Class folder '{path}' contains no files.")]
    EmptyClassFolder { path: PathBuf },

    /// A file does not carry one of the accepted image extensions.
    #[error("File '{file}' in '{path}' is not a valid image. Accepted file formats are: {accepted}.")]
    InvalidImageExtension {
        path: PathBuf,
        file: String,
        accepted: String,
    },

    /// Some of the indices `1..=N` have no file.
    #[error("Missing files for expected numbers: {missing:?} in class folder '{path}'.")]
    MissingIndices { path: PathBuf, missing: Vec<u64> },

    /// Two files resolve to the same sample index within one class.
    #[error("Class '{class}' in '{path}' has more than one file with index {index}: {files:?}.")]
    DuplicateIndex {
        path: PathBuf,
        class: String,
        index: u64,
        files: Vec<String>,
    },

    /// Wrong number of classes.
    #[error("Expected {expected} class folders in '{path}', but found {found}.")]
    ClassCountMismatch {
        path: PathBuf,
        found: usize,
        expected: usize,
    },

    /// Wrong number of files in one class.
    #[error("Class folder '{class}' contains {found} files, but {expected} were expected.")]
    FileCountMismatch {
        path: PathBuf,
        class: String,
        found: usize,
        expected: usize,
    },

    /// A class-qualified filename sits in a folder for a different class.
    #[error("File '{file}' is in class '{folder_class}', but its class part is '{parsed_class}'.")]
    ClassTokenMismatch {
        path: PathBuf,
        file: String,
        folder_class: String,
        parsed_class: String,
    },

    /// A filename matches none of the accepted patterns.
    #[error("File '{file}' in '{path}' does not follow the expected format ({expected}).")]
    UnrecognizedFilename {
        path: PathBuf,
        file: String,
        expected: &'static str,
    },
}

impl SchemaViolation {
    /// The file or folder the violation was detected at.
    pub fn path(&self) -> &Path {
        match self {
            SchemaViolation::InvalidRootCount { path, .. }
            | SchemaViolation::NoClassFolders { path }
            | SchemaViolation::StrayFile { path }
            | SchemaViolation::UnexpectedSubfolder { path, .. }
            | SchemaViolation::EmptyClassFolder { path }
            | SchemaViolation::InvalidImageExtension { path, .. }
            | SchemaViolation::MissingIndices { path, .. }
            | SchemaViolation::DuplicateIndex { path, .. }
            | SchemaViolation::ClassCountMismatch { path, .. }
            | SchemaViolation::FileCountMismatch { path, .. }
            | SchemaViolation::ClassTokenMismatch { path, .. }
            | SchemaViolation::UnrecognizedFilename { path, .. } => path,
        }
    }

    /// Stable machine-readable code, used in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            SchemaViolation::InvalidRootCount { .. } => "invalid_root_count",
            SchemaViolation::NoClassFolders { .. } => "no_class_folders",
            SchemaViolation::StrayFile { .. } => "stray_file",
            SchemaViolation::UnexpectedSubfolder { .. } => "unexpected_subfolder",
            SchemaViolation::EmptyClassFolder { .. } => "empty_class_folder",
            SchemaViolation::InvalidImageExtension { .. } => "invalid_image_extension",
            SchemaViolation::MissingIndices { .. } => "missing_indices",
            SchemaViolation::DuplicateIndex { .. } => "duplicate_index",
            SchemaViolation::ClassCountMismatch { .. } => "class_count_mismatch",
            SchemaViolation::FileCountMismatch { .. } => "file_count_mismatch",
            SchemaViolation::ClassTokenMismatch { .. } => "class_token_mismatch",
            SchemaViolation::UnrecognizedFilename { .. } => "unrecognized_filename",
        }
    }
}

/// Broad category of a [`ClassfoldError`], used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something we cannot accept.
    InvalidInput,
    /// A bucket, dataset, class or sample does not exist.
    NotFound,
    /// Filesystem, storage or serialization fault on our side.
    Internal,
}

/// Main error type for classfold operations.
#[derive(Debug, Error)]
pub enum ClassfoldError {
    /// The archive layout violates the dataset schema.
    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaViolation),

    /// Error reading or writing a file in the staging area.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive could not be read.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An archive entry would be written outside the extraction directory.
    #[error("Archive entry '{0}' escapes the extraction directory")]
    UnsafeArchiveEntry(String),

    /// Building a download archive failed.
    #[error("Failed to build archive: {0}")]
    Export(#[source] zip::result::ZipError),

    /// The uploaded file is not an archive we can expand.
    #[error("Unsupported archive '{0}': only .zip files are accepted")]
    UnsupportedArchive(String),

    /// Object store failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A bucket, dataset, class or sample is missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV report error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ClassfoldError {
    /// Wrap an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClassfoldError::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify the error for the API layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassfoldError::Schema(_)
            | ClassfoldError::Archive(_)
            | ClassfoldError::UnsafeArchiveEntry(_)
            | ClassfoldError::UnsupportedArchive(_)
            | ClassfoldError::Config(_) => ErrorKind::InvalidInput,
            ClassfoldError::NotFound(_) => ErrorKind::NotFound,
            ClassfoldError::Storage(e) if e.is_not_found() => ErrorKind::NotFound,
            ClassfoldError::Storage(StorageError::InvalidKey(_)) => ErrorKind::InvalidInput,
            ClassfoldError::Storage(_)
            | ClassfoldError::Io { .. }
            | ClassfoldError::Export(_)
            | ClassfoldError::Json(_)
            | ClassfoldError::Csv(_) => ErrorKind::Internal,
        }
    }

    /// The schema violation, when this is one.
    pub fn as_violation(&self) -> Option<&SchemaViolation> {
        match self {
            ClassfoldError::Schema(v) => Some(v),
            _ => None,
        }
    }
}

/// Result type alias for classfold operations.
pub type Result<T> = std::result::Result<T, ClassfoldError>;

//! Classfold: schema validator and normalizer for labeled image dataset archives.
//!
//! An uploaded archive holds one dataset folder. Either that folder already
//! contains one subfolder per class (structured), or it holds loose images whose
//! names carry the class (flat, e.g. `A_001.png`). Flat archives are regrouped
//! in place into `class/index.ext`; both shapes are then checked against the
//! expected number of classes and samples per class before anything is stored.
//!
//! # Core Principles
//!
//! - **All or nothing**: an archive is either fully accepted or rejected with
//!   the first violation found; nothing is stored for a rejected archive
//! - **Deterministic**: the same archive always yields the same verdict
//! - **Isolated**: each upload is staged in its own scratch directory
//!
//! # Example
//!
//! ```no_run
//! use classfold::{DatasetValidator, ValidationConfig};
//!
//! let validator = DatasetValidator::with_config(ValidationConfig::new(4, 200).unwrap());
//! let report = validator.validate_dir("extracted/").unwrap();
//!
//! println!("Mode: {}", report.mode.name());
//! println!("Classes: {:?}", report.class_names());
//! ```

pub mod archive;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod pattern;
pub mod report;
pub mod staging;
pub mod storage;
pub mod tree;
pub mod validation;

mod validator;

pub use crate::validator::{DatasetValidator, ValidationVerdict};
pub use catalog::{DatasetCatalog, FileUpload};
pub use classifier::{ArchiveLayout, ValidationMode};
pub use config::ValidationConfig;
pub use error::{ClassfoldError, ErrorKind, Result, SchemaViolation};
pub use ingest::{IngestReport, IngestRequest, Ingestor};
pub use pattern::{FileEntry, FilenameKind};
pub use report::ValidationReport;
pub use staging::{StagingArea, StagingStats};
pub use storage::{LocalObjectStore, MemoryObjectStore, ObjectInfo, ObjectStore, StorageError};
pub use tree::{FileTree, LocalTree, MemoryTree};

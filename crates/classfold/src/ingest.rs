//! Upload pipeline: staged archive → validated dataset → object store.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::archive::{ensure_zip_name, extract_zip};
use crate::classifier::ArchiveLayout;
use crate::config::ValidationConfig;
use crate::error::{ClassfoldError, Result};
use crate::report::ValidationReport;
use crate::staging::{StagingArea, StagingStats};
use crate::storage::{validate_bucket_name, validate_segment, ObjectStore};
use crate::tree::{FileTree, LocalTree};
use crate::validator::DatasetValidator;

/// One archive upload.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub bucket: String,
    /// Name the archive was uploaded under; must end in `.zip`.
    pub file_name: String,
    pub payload: Vec<u8>,
    /// Store under this name instead of the archive's dataset folder name.
    pub dataset_name: Option<String>,
    pub config: ValidationConfig,
}

impl IngestRequest {
    pub fn new(bucket: impl Into<String>, file_name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            bucket: bucket.into(),
            file_name: file_name.into(),
            payload,
            dataset_name: None,
            config: ValidationConfig::default(),
        }
    }

    pub fn with_dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = Some(name.into());
        self
    }

    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }
}

/// Result of a successful ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub bucket: String,
    /// Key prefix the dataset was stored under.
    pub dataset: String,
    pub objects_uploaded: usize,
    pub validation: ValidationReport,
}

/// Runs uploads against one object store.
#[derive(Debug)]
pub struct Ingestor<S: ObjectStore> {
    store: Arc<S>,
    stats: StagingStats,
    staging_dir: Option<PathBuf>,
}

impl<S: ObjectStore> Clone for Ingestor<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            stats: self.stats.clone(),
            staging_dir: self.staging_dir.clone(),
        }
    }
}

impl<S: ObjectStore> Ingestor<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            stats: StagingStats::new(),
            staging_dir: None,
        }
    }

    /// Create staging areas under `dir` instead of the system temp dir.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Staging counters; `outstanding()` is zero whenever no upload is running.
    pub fn stats(&self) -> &StagingStats {
        &self.stats
    }

    /// Validate an archive and, only if it passes, store its dataset.
    ///
    /// Nothing is written to the bucket when any step before the upload fails.
    /// The staging area is released on every path.
    pub fn ingest_archive(&self, request: IngestRequest) -> Result<IngestReport> {
        ensure_zip_name(&request.file_name)?;
        validate_bucket_name(&request.bucket)?;
        if !self.store.bucket_exists(&request.bucket)? {
            return Err(ClassfoldError::NotFound(format!(
                "Bucket '{}' does not exist.",
                request.bucket
            )));
        }
        request.config.validate()?;

        let staging = StagingArea::acquire(&self.stats, self.staging_dir.as_deref())?;
        let outcome = self.ingest_staged(&staging, &request);
        let released = staging.release();
        let outcome = outcome.and_then(|report| released.map(|()| report));

        match &outcome {
            Ok(report) => info!(
                bucket = %report.bucket,
                dataset = %report.dataset,
                objects = report.objects_uploaded,
                "dataset ingested"
            ),
            Err(e) => warn!(file = %request.file_name, error = %e, "ingest failed"),
        }
        outcome
    }

    fn ingest_staged(&self, staging: &StagingArea, request: &IngestRequest) -> Result<IngestReport> {
        let archive = staging.write_payload(&request.file_name, &request.payload)?;
        extract_zip(&archive, staging.path())?;

        let source_file = archive
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let layout = ArchiveLayout::new(staging.path()).with_source_file(source_file);

        let mut tree = LocalTree::new();
        let validation = DatasetValidator::with_config(request.config.clone())
            .validate(&mut tree, &layout)?;

        let dataset = request
            .dataset_name
            .clone()
            .unwrap_or_else(|| validation.dataset.clone());
        validate_segment(&dataset)?;

        let objects_uploaded = upload_dataset(
            &tree,
            self.store.as_ref(),
            &request.bucket,
            validation.mode.root(),
            &dataset,
            &request.config,
        )?;

        Ok(IngestReport {
            bucket: request.bucket.clone(),
            dataset,
            objects_uploaded,
            validation,
        })
    }
}

/// Put every file below `root` under `<dataset_name>/<relative path>`.
///
/// Ignored clutter is skipped. If any put fails, the call undoes its own
/// writes before returning the error: new keys are deleted and keys it
/// overwrote get their previous contents and metadata back. The replaced
/// objects are held in memory until the upload finishes.
pub fn upload_dataset<T, S>(
    tree: &T,
    store: &S,
    bucket: &str,
    root: &Path,
    dataset_name: &str,
    config: &ValidationConfig,
) -> Result<usize>
where
    T: FileTree + ?Sized,
    S: ObjectStore + ?Sized,
{
    let mut keys = Vec::new();
    for path in tree.walk_files(root)? {
        if let Some(key) = object_key(root, &path, dataset_name, config) {
            keys.push((key, path));
        }
    }

    let mut written: Vec<(&str, Option<Replaced>)> = Vec::with_capacity(keys.len());
    for (key, path) in &keys {
        let put = tree.read_file(path).and_then(|data| {
            let replaced = Replaced::capture(store, bucket, key)?;
            store.put_object(bucket, key, &data)?;
            Ok(replaced)
        });
        match put {
            Ok(replaced) => written.push((key.as_str(), replaced)),
            Err(e) => {
                roll_back(store, bucket, written);
                return Err(e);
            }
        }
    }

    info!(bucket, dataset = dataset_name, objects = written.len(), "dataset uploaded");
    Ok(written.len())
}

/// An object that a dataset upload is about to overwrite.
struct Replaced {
    data: Vec<u8>,
    metadata: Option<String>,
}

impl Replaced {
    fn capture<S: ObjectStore + ?Sized>(store: &S, bucket: &str, key: &str) -> Result<Option<Self>> {
        match store.get_object(bucket, key) {
            Ok(data) => {
                let metadata = store.stat_object(bucket, key)?.and_then(|info| info.metadata);
                Ok(Some(Self { data, metadata }))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn roll_back<S: ObjectStore + ?Sized>(store: &S, bucket: &str, written: Vec<(&str, Option<Replaced>)>) {
    for (key, replaced) in written.into_iter().rev() {
        let undo = match replaced {
            Some(old) => store
                .put_object_with_metadata(bucket, key, &old.data, old.metadata.as_deref())
                .map(|_| ()),
            None => store.delete_object(bucket, key),
        };
        if let Err(e) = undo {
            warn!(key, error = %e, "failed to roll back upload");
        }
    }
}

fn object_key(root: &Path, path: &Path, dataset_name: &str, config: &ValidationConfig) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut segments = vec![dataset_name.to_string()];
    for component in relative.components() {
        let Component::Normal(name) = component else {
            return None;
        };
        let name = name.to_string_lossy();
        if config.is_ignored(&name) {
            return None;
        }
        segments.push(name.into_owned());
    }
    Some(segments.join("/"))
}

//! Browsing and maintenance of stored datasets.
//!
//! Everything is addressed as bucket → dataset → class → sample, mapped onto
//! object keys `<dataset>/<class>/<sample>`. Each operation checks the chain
//! from the bucket down and reports the first missing link.
//!
//! Single files uploaded outside any dataset are top-level keys of a bucket.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::archive::ZipExport;
use crate::error::{ClassfoldError, Result};
use crate::storage::{validate_segment, ObjectInfo, ObjectStore};

/// Outcome of [`DatasetCatalog::upload_file`].
#[derive(Debug, Clone, Serialize)]
pub struct FileUpload {
    pub object: ObjectInfo,
    /// An object with the same name existed and was replaced.
    pub overwritten: bool,
}

/// Read/delete/download access to the datasets held in an object store.
#[derive(Debug)]
pub struct DatasetCatalog<S: ObjectStore> {
    store: Arc<S>,
}

impl<S: ObjectStore> Clone for DatasetCatalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ObjectStore> DatasetCatalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a bucket. Returns `false` when it already existed.
    pub fn create_bucket(&self, bucket: &str) -> Result<bool> {
        let created = self.store.create_bucket(bucket)?;
        if created {
            info!(bucket, "bucket created");
        }
        Ok(created)
    }

    /// Delete a bucket and all its datasets.
    pub fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.check_bucket(bucket)?;
        self.store.delete_bucket(bucket)?;
        info!(bucket, "bucket deleted");
        Ok(())
    }

    /// Top-level dataset names in a bucket, sorted.
    pub fn list_datasets(&self, bucket: &str) -> Result<Vec<String>> {
        self.check_bucket(bucket)?;
        let objects = self.store.list_objects(bucket, "")?;
        Ok(child_names(&objects, ""))
    }

    pub fn delete_dataset(&self, bucket: &str, dataset: &str) -> Result<usize> {
        let prefix = self.check_dataset(bucket, dataset)?;
        let removed = self.delete_prefix(bucket, &prefix)?;
        info!(bucket, dataset, objects = removed, "dataset deleted");
        Ok(removed)
    }

    /// Copy every object of a dataset to `dest/<dataset>/...`.
    pub fn download_dataset(&self, bucket: &str, dataset: &str, dest: &Path) -> Result<usize> {
        let prefix = self.check_dataset(bucket, dataset)?;
        self.download_prefix(bucket, &prefix, dest)
    }

    /// Zip every object of a dataset, keyed `<dataset>/<class>/<sample>`.
    pub fn export_dataset(&self, bucket: &str, dataset: &str) -> Result<Vec<u8>> {
        let prefix = self.check_dataset(bucket, dataset)?;
        self.export_prefix(bucket, &prefix)
    }

    /// Class names in a dataset, sorted.
    pub fn list_classes(&self, bucket: &str, dataset: &str) -> Result<Vec<String>> {
        let prefix = self.check_dataset(bucket, dataset)?;
        let objects = self.store.list_objects(bucket, &prefix)?;
        Ok(child_names(&objects, &prefix))
    }

    pub fn delete_class(&self, bucket: &str, dataset: &str, class: &str) -> Result<usize> {
        let prefix = self.check_class(bucket, dataset, class)?;
        let removed = self.delete_prefix(bucket, &prefix)?;
        info!(bucket, dataset, class, objects = removed, "class deleted");
        Ok(removed)
    }

    /// Copy every sample of one class to `dest/<dataset>/<class>/...`.
    pub fn download_class(
        &self,
        bucket: &str,
        dataset: &str,
        class: &str,
        dest: &Path,
    ) -> Result<usize> {
        let prefix = self.check_class(bucket, dataset, class)?;
        self.download_prefix(bucket, &prefix, dest)
    }

    /// Zip one class, keyed `<dataset>/<class>/<sample>`.
    pub fn export_class(&self, bucket: &str, dataset: &str, class: &str) -> Result<Vec<u8>> {
        let prefix = self.check_class(bucket, dataset, class)?;
        self.export_prefix(bucket, &prefix)
    }

    /// Samples of one class with their metadata, sorted by key.
    pub fn list_samples(&self, bucket: &str, dataset: &str, class: &str) -> Result<Vec<ObjectInfo>> {
        let prefix = self.check_class(bucket, dataset, class)?;
        Ok(self.store.list_objects(bucket, &prefix)?)
    }

    pub fn get_sample(
        &self,
        bucket: &str,
        dataset: &str,
        class: &str,
        sample: &str,
    ) -> Result<Vec<u8>> {
        let key = self.check_sample(bucket, dataset, class, sample)?;
        Ok(self.store.get_object(bucket, &key)?)
    }

    pub fn delete_sample(&self, bucket: &str, dataset: &str, class: &str, sample: &str) -> Result<()> {
        let key = self.check_sample(bucket, dataset, class, sample)?;
        self.store.delete_object(bucket, &key)?;
        info!(bucket, key = %key, "sample deleted");
        Ok(())
    }

    /// Store a single file at the top level of a bucket.
    ///
    /// An existing object of the same name is replaced together with its
    /// metadata; the outcome says whether that happened.
    pub fn upload_file(
        &self,
        bucket: &str,
        name: &str,
        data: &[u8],
        metadata: Option<&str>,
    ) -> Result<FileUpload> {
        self.check_bucket(bucket)?;
        let key = segment(name)?;
        let overwritten = self.store.stat_object(bucket, key)?.is_some();
        let object = self
            .store
            .put_object_with_metadata(bucket, key, data, metadata)?;
        if overwritten {
            info!(bucket, file = key, "file overwritten");
        } else {
            info!(bucket, file = key, "file uploaded");
        }
        Ok(FileUpload {
            object,
            overwritten,
        })
    }

    /// Contents and metadata of a top-level file.
    pub fn get_file(&self, bucket: &str, name: &str) -> Result<(ObjectInfo, Vec<u8>)> {
        let info = self.check_file(bucket, name)?;
        let data = self.store.get_object(bucket, &info.key)?;
        Ok((info, data))
    }

    /// Copy a top-level file to `dest/<name>`.
    pub fn download_file(&self, bucket: &str, name: &str, dest: &Path) -> Result<PathBuf> {
        let (info, data) = self.get_file(bucket, name)?;
        fs::create_dir_all(dest).map_err(|e| ClassfoldError::io(dest, e))?;
        let target = dest.join(&info.key);
        fs::write(&target, data).map_err(|e| ClassfoldError::io(&target, e))?;
        info!(bucket, file = %info.key, dest = %target.display(), "file downloaded");
        Ok(target)
    }

    pub fn delete_file(&self, bucket: &str, name: &str) -> Result<()> {
        let info = self.check_file(bucket, name)?;
        self.store.delete_object(bucket, &info.key)?;
        info!(bucket, file = %info.key, "file deleted");
        Ok(())
    }

    fn check_bucket(&self, bucket: &str) -> Result<()> {
        if self.store.bucket_exists(bucket)? {
            Ok(())
        } else {
            Err(ClassfoldError::NotFound(format!(
                "Bucket '{}' does not exist.",
                bucket
            )))
        }
    }

    fn check_dataset(&self, bucket: &str, dataset: &str) -> Result<String> {
        self.check_bucket(bucket)?;
        let prefix = format!("{}/", segment(dataset)?);
        if !self.has_prefix(bucket, &prefix)? {
            return Err(ClassfoldError::NotFound(format!(
                "Dataset '{}' does not exist in bucket '{}'.",
                dataset, bucket
            )));
        }
        Ok(prefix)
    }

    fn check_class(&self, bucket: &str, dataset: &str, class: &str) -> Result<String> {
        let dataset_prefix = self.check_dataset(bucket, dataset)?;
        let prefix = format!("{}{}/", dataset_prefix, segment(class)?);
        if !self.has_prefix(bucket, &prefix)? {
            return Err(ClassfoldError::NotFound(format!(
                "Class '{}' does not exist in dataset '{}' of bucket '{}'.",
                class, dataset, bucket
            )));
        }
        Ok(prefix)
    }

    fn check_sample(&self, bucket: &str, dataset: &str, class: &str, sample: &str) -> Result<String> {
        let class_prefix = self.check_class(bucket, dataset, class)?;
        let key = format!("{}{}", class_prefix, segment(sample)?);
        if self.store.stat_object(bucket, &key)?.is_none() {
            return Err(ClassfoldError::NotFound(format!(
                "Sample '{}' does not exist in class '{}' of dataset '{}' in bucket '{}'.",
                sample, class, dataset, bucket
            )));
        }
        Ok(key)
    }

    fn check_file(&self, bucket: &str, name: &str) -> Result<ObjectInfo> {
        self.check_bucket(bucket)?;
        self.store
            .stat_object(bucket, segment(name)?)?
            .ok_or_else(|| {
                ClassfoldError::NotFound(format!(
                    "File '{}' does not exist in bucket '{}'.",
                    name, bucket
                ))
            })
    }

    fn has_prefix(&self, bucket: &str, prefix: &str) -> Result<bool> {
        Ok(self.store.prefix_exists(bucket, prefix)?)
    }

    fn delete_prefix(&self, bucket: &str, prefix: &str) -> Result<usize> {
        let objects = self.store.list_objects(bucket, prefix)?;
        for object in &objects {
            self.store.delete_object(bucket, &object.key)?;
        }
        Ok(objects.len())
    }

    fn download_prefix(&self, bucket: &str, prefix: &str, dest: &Path) -> Result<usize> {
        let objects = self.store.list_objects(bucket, prefix)?;
        for object in &objects {
            let target = dest.join(&object.key);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ClassfoldError::io(parent, e))?;
            }
            let data = self.store.get_object(bucket, &object.key)?;
            fs::write(&target, data).map_err(|e| ClassfoldError::io(&target, e))?;
        }
        info!(bucket, prefix, dest = %dest.display(), objects = objects.len(), "downloaded");
        Ok(objects.len())
    }

    fn export_prefix(&self, bucket: &str, prefix: &str) -> Result<Vec<u8>> {
        let objects = self.store.list_objects(bucket, prefix)?;
        let mut export = ZipExport::new();
        for object in &objects {
            let data = self.store.get_object(bucket, &object.key)?;
            export.add_file(&object.key, &data)?;
        }
        info!(bucket, prefix, objects = objects.len(), "exported");
        export.finish()
    }
}

/// A dataset, class, sample or file name: exactly one key segment.
fn segment(name: &str) -> Result<&str> {
    validate_segment(name)?;
    Ok(name)
}

/// Distinct first path segments of the keys below `prefix`.
fn child_names(objects: &[ObjectInfo], prefix: &str) -> Vec<String> {
    objects
        .iter()
        .filter_map(|o| o.key.strip_prefix(prefix))
        .filter_map(|rest| rest.split_once('/').map(|(head, _)| head.to_string()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

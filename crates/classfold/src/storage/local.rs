//! Filesystem-backed object store: one directory per bucket under a root.
//!
//! Object metadata lives beside the buckets in `<root>/.metadata/<bucket>/<key>`,
//! which no bucket name can reach.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::WalkDir;

use super::{
    content_etag, validate_bucket_name, validate_key, ObjectInfo, ObjectStore, StorageError,
    StorageResult,
};

const METADATA_DIR: &str = ".metadata";

/// Stores `bucket/key` as a file at `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> StorageResult<PathBuf> {
        validate_bucket_name(bucket)?;
        let dir = self.root.join(bucket);
        if !dir.is_dir() {
            return Err(StorageError::BucketNotFound(bucket.to_string()));
        }
        Ok(dir)
    }

    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.bucket_dir(bucket)?.join(key))
    }

    fn metadata_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(METADATA_DIR).join(bucket).join(key)
    }

    fn read_metadata(&self, bucket: &str, key: &str) -> StorageResult<Option<String>> {
        let path = self.metadata_path(bucket, key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    fn write_metadata(&self, bucket: &str, key: &str, metadata: Option<&str>) -> StorageResult<()> {
        let path = self.metadata_path(bucket, key);
        match metadata {
            Some(text) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
                }
                fs::write(&path, text).map_err(|e| StorageError::io(&path, e))
            }
            None => self.remove_metadata(bucket, &path),
        }
    }

    fn remove_metadata(&self, bucket: &str, path: &Path) -> StorageResult<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                Self::prune_empty_dirs(&self.root.join(METADATA_DIR).join(bucket), path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    /// Size and timestamp only; listings do not read object contents.
    fn listed(key: String, path: &Path) -> StorageResult<ObjectInfo> {
        let metadata = fs::metadata(path).map_err(|e| StorageError::io(path, e))?;
        Ok(ObjectInfo {
            key,
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            etag: None,
            metadata: None,
        })
    }

    /// Directory that holds every key starting with `prefix`.
    fn prefix_dir(bucket_dir: &Path, prefix: &str) -> StorageResult<PathBuf> {
        match prefix.rsplit_once('/') {
            Some((dirs, _)) => {
                validate_key(dirs)?;
                Ok(bucket_dir.join(dirs))
            }
            None => Ok(bucket_dir.to_path_buf()),
        }
    }

    /// Visit the files below `prefix` until `visit` returns `false`.
    fn walk_prefix(
        bucket_dir: &Path,
        prefix: &str,
        mut visit: impl FnMut(String, &Path) -> StorageResult<bool>,
    ) -> StorageResult<()> {
        let start = Self::prefix_dir(bucket_dir, prefix)?;
        if !start.is_dir() {
            return Ok(());
        }
        for entry in WalkDir::new(&start) {
            let entry =
                entry.map_err(|e| StorageError::io(&start, io::Error::other(e.to_string())))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(bucket_dir) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) && !visit(key, entry.path())? {
                break;
            }
        }
        Ok(())
    }

    /// Remove empty parent directories left behind by a delete, up to `stop`.
    fn prune_empty_dirs(stop: &Path, from: &Path) {
        let mut dir = from.parent();
        while let Some(d) = dir {
            if d == stop || !d.starts_with(stop) || fs::remove_dir(d).is_err() {
                break;
            }
            dir = d.parent();
        }
    }
}

impl ObjectStore for LocalObjectStore {
    fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        validate_bucket_name(bucket)?;
        Ok(self.root.join(bucket).is_dir())
    }

    fn create_bucket(&self, bucket: &str) -> StorageResult<bool> {
        if self.bucket_exists(bucket)? {
            return Ok(false);
        }
        let dir = self.root.join(bucket);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        debug!(bucket, "bucket created");
        Ok(true)
    }

    fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        let dir = self.bucket_dir(bucket)?;
        fs::remove_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        let meta = self.root.join(METADATA_DIR).join(bucket);
        match fs::remove_dir_all(&meta) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&meta, e)),
        }
    }

    fn put_object_with_metadata(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        metadata: Option<&str>,
    ) -> StorageResult<ObjectInfo> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        fs::write(&path, data).map_err(|e| StorageError::io(&path, e))?;
        self.write_metadata(bucket, key, metadata)?;

        let mut info = Self::listed(key.to_string(), &path)?;
        info.etag = Some(content_etag(data));
        info.metadata = metadata.map(str::to_string);
        Ok(info)
    }

    fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::ObjectNotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectInfo>> {
        let path = self.object_path(bucket, key)?;
        if !path.is_file() {
            return Ok(None);
        }
        let data = fs::read(&path).map_err(|e| StorageError::io(&path, e))?;
        let mut info = Self::listed(key.to_string(), &path)?;
        info.etag = Some(content_etag(&data));
        info.metadata = self.read_metadata(bucket, key)?;
        Ok(Some(info))
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let dir = self.bucket_dir(bucket)?;
        let mut objects = Vec::new();
        Self::walk_prefix(&dir, prefix, |key, path| {
            objects.push(Self::listed(key, path)?);
            Ok(true)
        })?;
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn prefix_exists(&self, bucket: &str, prefix: &str) -> StorageResult<bool> {
        let dir = self.bucket_dir(bucket)?;
        let mut found = false;
        Self::walk_prefix(&dir, prefix, |_, _| {
            found = true;
            Ok(false)
        })?;
        Ok(found)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                Self::prune_empty_dirs(&self.root.join(bucket), &path);
                self.remove_metadata(bucket, &self.metadata_path(bucket, key))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::ObjectNotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }
}

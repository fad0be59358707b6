//! Object storage for validated datasets.
//!
//! Buckets hold flat `/`-separated keys. A dataset lives under
//! `<dataset>/<class>/<sample>` inside one bucket; single files uploaded on
//! their own sit at the top level of the bucket.

mod error;
mod local;
mod memory;

pub use error::StorageError;
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Information about a stored object from list/stat operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modified time, when the backend knows it.
    pub last_modified: Option<DateTime<Utc>>,
    /// Content hash, `sha256:<hex>`. Set by put and stat; listings may omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Caller-supplied metadata string. Set by put and stat; listings may omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// Operations every storage backend provides.
pub trait ObjectStore: Send + Sync {
    fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// Create a bucket. Returns `false` if it already existed.
    fn create_bucket(&self, bucket: &str) -> StorageResult<bool>;

    /// Remove a bucket and everything in it.
    fn delete_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// Store `data` under `key`, replacing any previous object and its metadata.
    fn put_object_with_metadata(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        metadata: Option<&str>,
    ) -> StorageResult<ObjectInfo>;

    /// Store `data` under `key` without metadata.
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> StorageResult<ObjectInfo> {
        self.put_object_with_metadata(bucket, key, data, None)
    }

    fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Object metadata, or `None` if the key is absent.
    fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectInfo>>;

    /// All objects whose key starts with `prefix`, sorted by key.
    fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    /// Whether at least one key starts with `prefix`.
    fn prefix_exists(&self, bucket: &str, prefix: &str) -> StorageResult<bool> {
        Ok(!self.list_objects(bucket, prefix)?.is_empty())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()>;
}

/// Content hash in the form stored in [`ObjectInfo::etag`].
pub fn content_etag(data: &[u8]) -> String {
    format!("sha256:{:x}", Sha256::digest(data))
}

/// Reject names that could escape the bucket or collide with directories.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.ends_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// A name that must be exactly one key segment.
pub fn validate_segment(name: &str) -> StorageResult<()> {
    validate_key(name)?;
    if name.contains('/') {
        return Err(StorageError::InvalidKey(name.to_string()));
    }
    Ok(())
}

/// Bucket names are single key segments that do not start with a dot.
pub fn validate_bucket_name(bucket: &str) -> StorageResult<()> {
    validate_segment(bucket)?;
    if bucket.starts_with('.') {
        return Err(StorageError::InvalidKey(bucket.to_string()));
    }
    Ok(())
}

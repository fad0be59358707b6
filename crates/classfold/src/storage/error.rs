//! Error types for object storage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by an [`ObjectStore`](super::ObjectStore) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Bucket '{0}' does not exist.")]
    BucketNotFound(String),

    #[error("Object '{0}' does not exist.")]
    ObjectNotFound(String),

    /// Bucket names and object keys must be relative, `/`-separated and free
    /// of `.`/`..` segments.
    #[error("Invalid bucket or object key: '{0}'")]
    InvalidKey(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error means the bucket or object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::BucketNotFound(_) | StorageError::ObjectNotFound(_)
        )
    }
}

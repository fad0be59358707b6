use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::{
    content_etag, validate_bucket_name, validate_key, ObjectInfo, ObjectStore, StorageError,
    StorageResult,
};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
    etag: String,
    metadata: Option<String>,
}

impl StoredObject {
    fn info(&self, key: &str) -> ObjectInfo {
        ObjectInfo {
            key: key.to_string(),
            size: self.data.len() as u64,
            last_modified: Some(self.last_modified),
            etag: Some(self.etag.clone()),
            metadata: self.metadata.clone(),
        }
    }
}

type Buckets = BTreeMap<String, BTreeMap<String, StoredObject>>;

/// Keeps every bucket in process memory.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    buckets: RwLock<Buckets>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of objects across all buckets.
    pub fn object_count(&self) -> usize {
        self.buckets
            .read()
            .map(|b| b.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    fn read<R>(&self, bucket: &str, f: impl FnOnce(&BTreeMap<String, StoredObject>) -> R) -> StorageResult<R> {
        let buckets = self.buckets.read().map_err(|_| StorageError::LockPoisoned)?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        Ok(f(objects))
    }

    fn write<R>(
        &self,
        bucket: &str,
        f: impl FnOnce(&mut BTreeMap<String, StoredObject>) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let mut buckets = self.buckets.write().map_err(|_| StorageError::LockPoisoned)?;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        f(objects)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        let buckets = self.buckets.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(buckets.contains_key(bucket))
    }

    fn create_bucket(&self, bucket: &str) -> StorageResult<bool> {
        validate_bucket_name(bucket)?;
        let mut buckets = self.buckets.write().map_err(|_| StorageError::LockPoisoned)?;
        if buckets.contains_key(bucket) {
            return Ok(false);
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(true)
    }

    fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut buckets = self.buckets.write().map_err(|_| StorageError::LockPoisoned)?;
        buckets
            .remove(bucket)
            .map(|_| ())
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))
    }

    fn put_object_with_metadata(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        metadata: Option<&str>,
    ) -> StorageResult<ObjectInfo> {
        validate_key(key)?;
        self.write(bucket, |objects| {
            let object = StoredObject {
                data: data.to_vec(),
                last_modified: Utc::now(),
                etag: content_etag(data),
                metadata: metadata.map(str::to_string),
            };
            let info = object.info(key);
            objects.insert(key.to_string(), object);
            Ok(info)
        })
    }

    fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.read(bucket, |objects| objects.get(key).map(|o| o.data.clone()))?
            .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))
    }

    fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectInfo>> {
        self.read(bucket, |objects| objects.get(key).map(|o| o.info(key)))
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        self.read(bucket, |objects| {
            objects
                .range(prefix.to_string()..)
                .take_while(|(key, _)| key.starts_with(prefix))
                .map(|(key, object)| object.info(key))
                .collect()
        })
    }

    fn prefix_exists(&self, bucket: &str, prefix: &str) -> StorageResult<bool> {
        self.read(bucket, |objects| {
            objects
                .range(prefix.to_string()..)
                .next()
                .is_some_and(|(key, _)| key.starts_with(prefix))
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.write(bucket, |objects| {
            objects
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_list_delete() {
        let store = MemoryObjectStore::new();
        assert!(store.create_bucket("b").unwrap());
        assert!(!store.create_bucket("b").unwrap());

        store.put_object("b", "ds/A/01.png", b"a").unwrap();
        store.put_object("b", "ds/B/01.png", b"bb").unwrap();
        store.put_object("b", "other/A/01.png", b"c").unwrap();

        let keys: Vec<String> = store
            .list_objects("b", "ds/")
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        assert_eq!(keys, vec!["ds/A/01.png", "ds/B/01.png"]);

        assert_eq!(store.get_object("b", "ds/B/01.png").unwrap(), b"bb");
        store.delete_object("b", "ds/B/01.png").unwrap();
        assert!(store.stat_object("b", "ds/B/01.png").unwrap().is_none());
        assert_eq!(store.object_count(), 2);
    }

    #[test]
    fn test_missing_bucket() {
        let store = MemoryObjectStore::new();
        let err = store.put_object("nope", "k", b"x").unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.bucket_exists("nope").unwrap());
    }

    #[test]
    fn test_metadata_and_prefix_exists() {
        let store = MemoryObjectStore::new();
        store.create_bucket("b").unwrap();
        store
            .put_object_with_metadata("b", "photo.png", b"p", Some("source=camera"))
            .unwrap();
        store.put_object("b", "ds/A/01.png", b"a").unwrap();

        let stat = store.stat_object("b", "photo.png").unwrap().unwrap();
        assert_eq!(stat.metadata.as_deref(), Some("source=camera"));
        assert!(store.prefix_exists("b", "ds/A/").unwrap());
        assert!(!store.prefix_exists("b", "ds/B/").unwrap());
        assert!(!store.prefix_exists("b", "e").unwrap());
    }

    #[test]
    fn test_missing_object() {
        let store = MemoryObjectStore::new();
        store.create_bucket("b").unwrap();
        assert!(matches!(
            store.get_object("b", "k"),
            Err(StorageError::ObjectNotFound(_))
        ));
    }
}

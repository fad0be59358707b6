//! Application state for the web server.

use std::sync::Arc;

use classfold::{DatasetCatalog, Ingestor, LocalObjectStore};

use super::ServerConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Browse/delete access to stored datasets.
    pub catalog: DatasetCatalog<LocalObjectStore>,
    /// Upload pipeline over the same store.
    pub ingestor: Ingestor<LocalObjectStore>,
    /// Upload body limit.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create state over an existing store.
    pub fn new(store: Arc<LocalObjectStore>) -> Self {
        Self {
            catalog: DatasetCatalog::new(Arc::clone(&store)),
            ingestor: Ingestor::new(store),
            max_upload_bytes: super::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Open the store named in `config`.
    pub fn open(config: &ServerConfig) -> Result<Self, classfold::StorageError> {
        let store = LocalObjectStore::open(&config.store_dir)?;
        Ok(Self {
            max_upload_bytes: config.max_upload_bytes,
            ..Self::new(Arc::new(store))
        })
    }
}

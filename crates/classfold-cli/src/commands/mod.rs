//! CLI command implementations.

pub mod bucket;
pub mod delete;
pub mod download;
pub mod file;
pub mod ingest;
pub mod list;
pub mod serve;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use classfold::{DatasetCatalog, LocalObjectStore};

/// Open the store directory and wrap it in a catalog.
pub fn open_catalog(
    store_dir: &Path,
) -> Result<DatasetCatalog<LocalObjectStore>, Box<dyn std::error::Error>> {
    let store = LocalObjectStore::open(store_dir)?;
    Ok(DatasetCatalog::new(Arc::new(store)))
}

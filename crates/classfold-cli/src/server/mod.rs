//! HTTP API for uploading and browsing datasets.

pub mod app;
pub mod error;
pub mod handlers;
pub mod state;

use std::path::PathBuf;

/// Largest accepted upload body.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Settings for the API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding the object store buckets.
    pub store_dir: PathBuf,
    pub port: u16,
    /// Request body limit for archive uploads.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("./classfold-store"),
            port: 8000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

//! Object storage module
//!
//! Uploaded videos are written once under a fresh random key and never
//! overwritten in place.
//!
//! # Example
//!
//! ```
//! use tubely::media::Orientation;
//! use tubely::storage::{ObjectLocation, StorageKey};
//!
//! let location = ObjectLocation::new("tubely-videos", "us-east-2");
//! let key = StorageKey::generate(Orientation::Landscape).unwrap();
//! let url = location.url_for(&key);
//! assert!(url.starts_with("https://tubely-videos.s3.us-east-2.amazonaws.com/landscape/"));
//! ```

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

pub mod key;
pub mod memory;
pub mod s3;

pub use key::StorageKey;
pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

use crate::config::StorageConfig;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Randomness source unavailable: {0}")]
    EntropyUnavailable(String),
}

/// Result of a successful put
#[derive(Debug, Clone)]
pub struct PutObjectOutput {
    pub etag: Option<String>,
    pub bytes_written: u64,
}

/// Remote object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream the file at `source` to `key`, tagged with `content_type`
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        source: &Path,
    ) -> Result<PutObjectOutput, StorageError>;

    /// Remove the object at `key`
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

/// Where stored objects are publicly reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub region: String,
    pub public_base_url: Option<String>,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            public_base_url: None,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    /// Origin objects are served from, without a trailing slash
    pub fn origin(&self) -> String {
        match &self.public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }

    /// Public URL persisted for `key`
    pub fn url_for(&self, key: &StorageKey) -> String {
        format!("{}/{}", self.origin(), key)
    }
}

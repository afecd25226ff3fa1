//! Video metadata
//!
//! Video records are created elsewhere; this service only reads them and
//! replaces their content or thumbnail URL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;

pub use memory::MemoryVideoStore;

/// Metadata store errors
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Video not found: {0}")]
    NotFound(Uuid),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid seed data: {0}")]
    SeedError(#[from] serde_json::Error),

    #[error("Metadata backend error: {0}")]
    Backend(String),
}

/// A video owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a record with no content attached yet
    pub fn new(user_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            description: String::new(),
            thumbnail_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user_id` may change this record
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Video metadata store
///
/// Both calls are treated as atomic. Concurrent updates of one record are
/// last-write-wins.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Fetch a video record by id
    async fn get_video(&self, id: Uuid) -> Result<Option<VideoRecord>, MetadataError>;

    /// Replace an existing video record
    async fn update_video(&self, video: &VideoRecord) -> Result<(), MetadataError>;
}

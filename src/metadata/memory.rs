//! In-process video store

use super::{MetadataError, VideoRecord, VideoStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::Path;
use uuid::Uuid;

/// Video store backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryVideoStore {
    videos: DashMap<Uuid, VideoRecord>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records from a JSON array file
    ///
    /// Returns the number of records loaded.
    pub fn load_seed<P: AsRef<Path>>(&self, path: P) -> Result<usize, MetadataError> {
        let content = std::fs::read_to_string(path)?;
        let records: Vec<VideoRecord> = serde_json::from_str(&content)?;
        let count = records.len();
        for record in records {
            self.insert(record);
        }
        Ok(count)
    }

    /// Insert or replace a record
    pub fn insert(&self, video: VideoRecord) {
        self.videos.insert(video.id, video);
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn get_video(&self, id: Uuid) -> Result<Option<VideoRecord>, MetadataError> {
        Ok(self.videos.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update_video(&self, video: &VideoRecord) -> Result<(), MetadataError> {
        match self.videos.get_mut(&video.id) {
            Some(mut entry) => {
                *entry = video.clone();
                Ok(())
            }
            None => Err(MetadataError::NotFound(video.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_get_missing_video() {
        let store = MemoryVideoStore::new();
        assert!(store.get_video(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_existing_video() {
        let store = MemoryVideoStore::new();
        let mut video = VideoRecord::new(Uuid::new_v4(), "clip");
        store.insert(video.clone());

        video.video_url = Some("https://example.com/v.mp4".into());
        store.update_video(&video).await.unwrap();

        let stored = store.get_video(video.id).await.unwrap().unwrap();
        assert_eq!(stored.video_url.as_deref(), Some("https://example.com/v.mp4"));
    }

    #[tokio::test]
    async fn test_update_unknown_video_fails() {
        let store = MemoryVideoStore::new();
        let video = VideoRecord::new(Uuid::new_v4(), "ghost");
        assert!(matches!(
            store.update_video(&video).await,
            Err(MetadataError::NotFound(id)) if id == video.id
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_seed() {
        let videos = vec![
            VideoRecord::new(Uuid::new_v4(), "one"),
            VideoRecord::new(Uuid::new_v4(), "two"),
        ];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&videos).unwrap().as_bytes())
            .unwrap();

        let store = MemoryVideoStore::new();
        assert_eq!(store.load_seed(file.path()).unwrap(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_load_seed_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();

        let store = MemoryVideoStore::new();
        assert!(matches!(
            store.load_seed(file.path()),
            Err(MetadataError::SeedError(_))
        ));
    }
}

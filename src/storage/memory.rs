//! In-process object store for local runs and tests

use super::{ObjectStore, PutObjectOutput, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::path::Path;

/// An object held by [`MemoryObjectStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub content_type: String,
    pub body: Bytes,
}

/// [`ObjectStore`] backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|entry| entry.value().clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        source: &Path,
    ) -> Result<PutObjectOutput, StorageError> {
        let body = Bytes::from(tokio::fs::read(source).await?);
        let bytes_written = body.len() as u64;

        self.objects.insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                body,
            },
        );

        Ok(PutObjectOutput {
            etag: None,
            bytes_written,
        })
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.objects.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, b"moov-then-mdat").unwrap();

        let store = MemoryObjectStore::new();
        let output = store
            .put_object("other/abc.mp4", "video/mp4", &source)
            .await
            .unwrap();
        assert_eq!(output.bytes_written, 14);

        let stored = store.get("other/abc.mp4").unwrap();
        assert_eq!(stored.content_type, "video/mp4");
        assert_eq!(stored.body, Bytes::from_static(b"moov-then-mdat"));

        store.delete_object("other/abc.mp4").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_missing_source() {
        let store = MemoryObjectStore::new();
        let result = store
            .put_object("other/abc.mp4", "video/mp4", Path::new("/nonexistent/x.mp4"))
            .await;
        assert!(matches!(result, Err(StorageError::IoError(_))));
        assert!(store.is_empty());
    }
}

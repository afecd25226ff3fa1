//! Staged upload files
//!
//! Uploads are streamed to local disk before the media tools see them.
//! Every staged path is owned by a [`StagedFile`] guard, so the file is
//! removed on every exit path: success, error, or a dropped request future.
//!
//! # Example
//!
//! ```no_run
//! use tubely::ingest::{staging, BufferedUpload, UploadBody};
//! use bytes::Bytes;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut body = BufferedUpload::new(Some("video/mp4"), Bytes::from_static(b"...."));
//! body.open().await?;
//!
//! let path = staging::upload_path(&std::env::temp_dir());
//! let staged = staging::stage_upload(&mut body, path, 1 << 30).await?;
//! println!("{} bytes, sha256 {}", staged.size(), staged.content_hash());
//! # Ok(())
//! # }
//! ```

use super::{IngestError, UploadBody};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Removes the file at its path when dropped
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    /// Take ownership of `path`; it need not exist yet
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file and release the guard
    pub fn persist(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove staged file"
            ),
        }
    }
}

/// A fully written upload
#[derive(Debug)]
pub struct StagedUpload {
    file: StagedFile,
    size: u64,
    content_hash: String,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Hex SHA-256 of the staged bytes
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn into_file(self) -> StagedFile {
        self.file
    }
}

/// Fresh staging path for a video upload inside `dir`
pub fn upload_path(dir: &Path) -> PathBuf {
    dir.join(format!("tubely-upload-{}.mp4", uuid::Uuid::new_v4()))
}

/// Stream the remaining chunks of `body` into a new file at `path`.
///
/// Fails with `PayloadTooLarge` as soon as more than `limit` bytes arrive.
/// The file is removed on any error.
pub async fn stage_upload<B>(
    body: &mut B,
    path: PathBuf,
    limit: u64,
) -> Result<StagedUpload, IngestError>
where
    B: UploadBody + ?Sized,
{
    let guard = StagedFile::adopt(path);
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(guard.path())
        .await?;

    let mut hasher = Sha256::new();
    let mut size: u64 = 0;

    while let Some(chunk) = body.chunk().await? {
        size += chunk.len() as u64;
        if size > limit {
            return Err(IngestError::PayloadTooLarge { limit });
        }
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    drop(file);

    Ok(StagedUpload {
        file: guard,
        size,
        content_hash: hex::encode(hasher.finalize()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::BufferedUpload;
    use bytes::Bytes;

    async fn opened(data: &'static [u8]) -> BufferedUpload {
        let mut body =
            BufferedUpload::with_chunk_size(Some("video/mp4"), Bytes::from_static(data), 3);
        body.open().await.unwrap();
        body
    }

    #[tokio::test]
    async fn test_stage_writes_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = opened(b"hello world").await;

        let staged = stage_upload(&mut body, upload_path(dir.path()), 1024)
            .await
            .unwrap();

        assert_eq!(staged.size(), 11);
        assert_eq!(
            staged.content_hash(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = opened(b"abc").await;

        let staged = stage_upload(&mut body, upload_path(dir.path()), 1024)
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_limit_exceeded_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = opened(b"0123456789").await;

        let result = stage_upload(&mut body, upload_path(dir.path()), 4).await;

        assert!(matches!(
            result,
            Err(IngestError::PayloadTooLarge { limit: 4 })
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_exact_limit_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = opened(b"0123").await;

        let staged = stage_upload(&mut body, upload_path(dir.path()), 4)
            .await
            .unwrap();
        assert_eq!(staged.size(), 4);
    }

    #[test]
    fn test_persist_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.png");
        std::fs::write(&path, b"png").unwrap();

        let kept = StagedFile::adopt(&path).persist();
        assert_eq!(kept, path);
        assert!(path.exists());
    }

    #[test]
    fn test_drop_of_missing_path_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        drop(StagedFile::adopt(dir.path().join("never-created")));
    }

    #[test]
    fn test_upload_paths_are_unique() {
        let dir = Path::new("/tmp");
        let a = upload_path(dir);
        let b = upload_path(dir);
        assert_ne!(a, b);
        assert!(a.file_name().unwrap().to_string_lossy().starts_with("tubely-upload-"));
    }
}

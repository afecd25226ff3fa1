//! Thumbnail uploads
//!
//! Thumbnails are small images kept on local disk under the assets root and
//! served back by the HTTP server at `/assets/<file>`.

use crate::auth::Authenticator;
use crate::config::Config;
use crate::ingest::staging::stage_upload;
use crate::ingest::{authorize_owner, media_type_essence, IngestError, IngestRequest, UploadBody};
use crate::metadata::{VideoRecord, VideoStore};
use crate::metrics;
use crate::storage::key::random_token;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Stores thumbnails and points video records at them
pub struct ThumbnailUploader {
    authenticator: Arc<dyn Authenticator>,
    videos: Arc<dyn VideoStore>,
    assets_root: PathBuf,
    base_url: String,
    max_bytes: u64,
}

impl ThumbnailUploader {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        videos: Arc<dyn VideoStore>,
        assets_root: impl Into<PathBuf>,
        base_url: impl Into<String>,
        max_bytes: u64,
    ) -> Self {
        Self {
            authenticator,
            videos,
            assets_root: assets_root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn from_config(
        config: &Config,
        authenticator: Arc<dyn Authenticator>,
        videos: Arc<dyn VideoStore>,
    ) -> Self {
        Self::new(
            authenticator,
            videos,
            config.server.assets_root.clone(),
            config.server.base_url.clone(),
            config.server.max_thumbnail_bytes,
        )
    }

    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }

    /// Largest accepted upload, in bytes
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Store the uploaded image and set the record's `thumbnail_url`
    #[tracing::instrument(
        name = "thumbnail.upload",
        skip(self, request, body),
        fields(video.id = %request.video_id, user.id = tracing::field::Empty)
    )]
    pub async fn upload<B>(
        &self,
        request: &IngestRequest,
        body: &mut B,
    ) -> Result<VideoRecord, IngestError>
    where
        B: UploadBody + ?Sized,
    {
        let result = self.store(request, body).await;

        metrics::record_thumbnail(result.is_ok());
        match &result {
            Ok(video) => tracing::info!(
                video_id = %video.id,
                url = video.thumbnail_url.as_deref().unwrap_or_default(),
                "Thumbnail stored"
            ),
            Err(e) if e.is_client_error() => {
                tracing::warn!(error = %e, "Thumbnail upload rejected")
            }
            Err(e) => tracing::error!(error = %e, "Thumbnail upload failed"),
        }

        result
    }

    async fn store<B>(
        &self,
        request: &IngestRequest,
        body: &mut B,
    ) -> Result<VideoRecord, IngestError>
    where
        B: UploadBody + ?Sized,
    {
        let mut video =
            authorize_owner(self.authenticator.as_ref(), self.videos.as_ref(), request).await?;

        let declared = body
            .open()
            .await?
            .ok_or_else(|| IngestError::BadInput("Missing Content-Type for thumbnail".into()))?;
        let extension = image_extension(&declared)?;

        tokio::fs::create_dir_all(&self.assets_root).await?;
        let token = random_token().map_err(|e| IngestError::Internal(e.to_string()))?;
        let file_name = format!("{}.{}", token, extension);

        let staged = stage_upload(body, self.assets_root.join(&file_name), self.max_bytes).await?;

        video.thumbnail_url = Some(format!("{}/assets/{}", self.base_url, file_name));
        video.updated_at = Utc::now();
        self.videos.update_video(&video).await?;

        // Committed: keep the file for the asset route
        staged.into_file().persist();
        Ok(video)
    }
}

/// File extension for a declared image media type.
///
/// Only `image/*` is accepted; the subtype is reduced to ASCII
/// alphanumerics so it is safe in a file name.
pub fn image_extension(declared: &str) -> Result<String, IngestError> {
    let media_type = media_type_essence(declared);
    let subtype = media_type
        .strip_prefix("image/")
        .ok_or_else(|| IngestError::UnsupportedMediaType(media_type.clone()))?;

    let extension: String = subtype
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if extension.is_empty() {
        return Err(IngestError::UnsupportedMediaType(media_type));
    }
    Ok(extension)
}

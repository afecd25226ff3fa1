//! Video ingest pipeline

use super::staging::{self, StagedFile};
use super::{
    authorize_owner, media_type_essence, IngestError, IngestRequest, IngestStage, StageTracker,
    UploadBody,
};
use crate::auth::Authenticator;
use crate::config::Config;
use crate::media::remux::remux_output_path;
use crate::media::{MediaToolkit, Orientation};
use crate::metadata::{VideoRecord, VideoStore};
use crate::metrics;
use crate::storage::{ObjectLocation, ObjectStore, StorageKey};
use crate::VIDEO_MEDIA_TYPE;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::field::Empty;

/// Tunables for [`VideoIngestor`]
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Where uploads are staged
    pub temp_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub location: ObjectLocation,
}

impl IngestSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            temp_dir: config.media.temp_dir(),
            max_upload_bytes: config.server.max_upload_bytes,
            location: ObjectLocation::from_config(&config.storage),
        }
    }
}

/// Result of a committed ingest
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub video: VideoRecord,
    pub key: StorageKey,
    pub orientation: Orientation,
    pub size: u64,
}

/// Runs uploads through validation, staging, probing, remuxing, storage
/// and the metadata commit
pub struct VideoIngestor {
    authenticator: Arc<dyn Authenticator>,
    videos: Arc<dyn VideoStore>,
    objects: Arc<dyn ObjectStore>,
    media: Arc<dyn MediaToolkit>,
    settings: IngestSettings,
}

impl VideoIngestor {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        videos: Arc<dyn VideoStore>,
        objects: Arc<dyn ObjectStore>,
        media: Arc<dyn MediaToolkit>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            authenticator,
            videos,
            objects,
            media,
            settings,
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Ingest one upload for the video named in `request`.
    ///
    /// On success the stored object exists and the record's `video_url`
    /// points at it. On failure no staged file remains and the record is
    /// unchanged.
    #[tracing::instrument(
        name = "ingest.video",
        skip(self, request, body),
        fields(
            video.id = %request.video_id,
            user.id = Empty,
            ingest.stage = Empty,
            upload.bytes = Empty,
            media.orientation = Empty,
            storage.key = Empty
        )
    )]
    pub async fn ingest<B>(
        &self,
        request: &IngestRequest,
        body: &mut B,
    ) -> Result<IngestOutcome, IngestError>
    where
        B: UploadBody + ?Sized,
    {
        let start = Instant::now();
        let mut tracker = StageTracker::new();

        let result = self.run(request, body, &mut tracker).await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(outcome) => {
                metrics::record_ingest_success(outcome.orientation.prefix(), outcome.size, elapsed);
                tracing::info!(
                    video_id = %outcome.video.id,
                    key = %outcome.key,
                    bytes = outcome.size,
                    duration_ms = (elapsed * 1000.0) as u64,
                    "Video ingested"
                );
            }
            Err(e) => {
                let state = tracker.fail(e.kind());
                let stage = tracker.stage();
                metrics::record_ingest_failure(stage.as_str(), e.kind(), elapsed);
                if e.is_client_error() {
                    tracing::warn!(
                        stage = stage.as_str(),
                        ?state,
                        error = %e,
                        "Video ingest rejected"
                    );
                } else {
                    tracing::error!(
                        stage = stage.as_str(),
                        ?state,
                        error = %e,
                        "Video ingest failed"
                    );
                }
            }
        }

        result
    }

    async fn run<B>(
        &self,
        request: &IngestRequest,
        body: &mut B,
        tracker: &mut StageTracker,
    ) -> Result<IngestOutcome, IngestError>
    where
        B: UploadBody + ?Sized,
    {
        let span = tracing::Span::current();
        let mut video =
            authorize_owner(self.authenticator.as_ref(), self.videos.as_ref(), request).await?;

        let declared = body
            .open()
            .await?
            .ok_or_else(|| IngestError::BadInput("Missing Content-Type for video".into()))?;
        let media_type = media_type_essence(&declared);
        if media_type != VIDEO_MEDIA_TYPE {
            return Err(IngestError::UnsupportedMediaType(media_type));
        }

        let staged = staging::stage_upload(
            body,
            staging::upload_path(&self.settings.temp_dir),
            self.settings.max_upload_bytes,
        )
        .await?;
        span.record("upload.bytes", staged.size());
        tracing::debug!(
            bytes = staged.size(),
            sha256 = staged.content_hash(),
            "Upload staged"
        );
        tracker.advance(IngestStage::Staged);

        let geometry = self
            .media
            .probe(staged.path())
            .await
            .map_err(IngestError::ProbeError)?;
        tracker.advance(IngestStage::Probed);

        let orientation = geometry.orientation();
        span.record("media.orientation", orientation.prefix());
        tracker.advance(IngestStage::Classified);

        // Armed before the remux starts so a cancelled request cannot leave
        // a partial output behind.
        let remux_guard = StagedFile::adopt(remux_output_path(staged.path()));
        let remuxed = self
            .media
            .remux(staged.path())
            .await
            .map_err(IngestError::RemuxError)?;
        let _extra_guard = (remuxed != staged.path() && remuxed != remux_guard.path())
            .then(|| StagedFile::adopt(remuxed.clone()));
        tracker.advance(IngestStage::Remuxed);

        let key = StorageKey::generate(orientation)
            .map_err(|e| IngestError::Internal(e.to_string()))?;
        let object_key = key.to_string();
        span.record("storage.key", object_key.as_str());
        tracker.advance(IngestStage::KeyAssigned);

        self.objects
            .put_object(&object_key, VIDEO_MEDIA_TYPE, &remuxed)
            .await?;
        tracker.advance(IngestStage::Uploaded);

        video.video_url = Some(self.settings.location.url_for(&key));
        video.updated_at = Utc::now();
        if let Err(e) = self.videos.update_video(&video).await {
            self.discard_object(&object_key).await;
            return Err(e.into());
        }
        tracker.advance(IngestStage::Committed);

        Ok(IngestOutcome {
            video,
            key,
            orientation,
            size: staged.size(),
        })
    }

    /// Remove an object whose metadata commit failed
    async fn discard_object(&self, key: &str) {
        match self.objects.delete_object(key).await {
            Ok(()) => tracing::info!(key, "Removed uncommitted object"),
            Err(e) => {
                metrics::record_error("orphaned_object");
                tracing::error!(key, error = %e, "Failed to remove uncommitted object");
            }
        }
    }
}

//! Ingest module
//!
//! Request-scoped control flow for video uploads:
//!
//! ```text
//! Received -> Staged -> Probed -> Classified -> Remuxed -> KeyAssigned -> Uploaded -> Committed
//!     \________\_________\__________\___________\___________\____________\______> Failed
//! ```
//!
//! Ownership and input-type checks run before anything touches disk, and
//! every file staged for a request is removed when the request ends.

use hyper::StatusCode;
use thiserror::Error;
use uuid::Uuid;

pub mod body;
pub mod pipeline;
pub mod stage;
pub mod staging;

pub use body::{BufferedUpload, UploadBody};
pub use pipeline::{IngestOutcome, IngestSettings, VideoIngestor};
pub use stage::{IngestStage, IngestState, StageTracker};
pub use staging::{StagedFile, StagedUpload};

use crate::auth::{AuthError, AuthRequest, Authenticator};
use crate::media::MediaError;
use crate::metadata::{MetadataError, VideoRecord, VideoStore};
use crate::metrics;
use crate::storage::StorageError;

/// Ingest errors
///
/// `Display` output is for logs. Callers get [`IngestError::public_message`].
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Bad input: {0}")]
    BadInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("User {user_id} does not own video {video_id}")]
    Forbidden { user_id: Uuid, video_id: Uuid },

    #[error("Video not found: {0}")]
    NotFound(Uuid),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Probe failed: {0}")]
    ProbeError(#[source] MediaError),

    #[error("Remux failed: {0}")]
    RemuxError(#[source] MediaError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Metadata error: {0}")]
    MetadataError(#[from] MetadataError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// HTTP status reported to the caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::BadInput(_) => StatusCode::BAD_REQUEST,
            IngestError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            IngestError::Forbidden { .. } => StatusCode::FORBIDDEN,
            IngestError::NotFound(_) => StatusCode::NOT_FOUND,
            IngestError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            IngestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            IngestError::ProbeError(_)
            | IngestError::RemuxError(_)
            | IngestError::StorageError(_)
            | IngestError::MetadataError(_)
            | IngestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller: no tool output, no paths
    pub fn public_message(&self) -> String {
        match self {
            IngestError::BadInput(message) => message.clone(),
            IngestError::Unauthorized(AuthError::MissingAuth) => "Couldn't find JWT".to_string(),
            IngestError::Unauthorized(AuthError::TokenExpired) => "Token expired".to_string(),
            IngestError::Unauthorized(_) => "Couldn't validate JWT".to_string(),
            IngestError::Forbidden { .. } => "You're not the video owner".to_string(),
            IngestError::NotFound(_) => "Video not found".to_string(),
            IngestError::UnsupportedMediaType(media_type) => {
                format!("Unsupported media type: {}", media_type)
            }
            IngestError::PayloadTooLarge { limit } => {
                format!("Upload exceeds the {} byte limit", limit)
            }
            IngestError::ProbeError(_) => "Unable to read video metadata".to_string(),
            IngestError::RemuxError(_) => "Unable to process video".to_string(),
            IngestError::StorageError(_) => "Unable to store video".to_string(),
            IngestError::MetadataError(_) | IngestError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }

    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::BadInput(_) => "bad_input",
            IngestError::Unauthorized(_) => "unauthorized",
            IngestError::Forbidden { .. } => "forbidden",
            IngestError::NotFound(_) => "not_found",
            IngestError::UnsupportedMediaType(_) => "unsupported_media_type",
            IngestError::PayloadTooLarge { .. } => "payload_too_large",
            IngestError::ProbeError(_) => "probe_error",
            IngestError::RemuxError(_) => "remux_error",
            IngestError::StorageError(_) => "storage_error",
            IngestError::MetadataError(_) => "metadata_error",
            IngestError::Internal(_) => "internal",
        }
    }

    /// Whether the failure was caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl From<std::io::Error> for IngestError {
    fn from(e: std::io::Error) -> Self {
        IngestError::Internal(e.to_string())
    }
}

/// Identifies the target video and carries the caller's credentials
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    /// Raw path parameter; parsed as a UUID before anything else
    pub video_id: String,
    pub auth: AuthRequest,
}

impl IngestRequest {
    pub fn new(video_id: impl Into<String>, auth: AuthRequest) -> Self {
        Self {
            video_id: video_id.into(),
            auth,
        }
    }
}

/// Resolve the caller and the target record, in order:
/// id syntax, credentials, existence, ownership.
pub async fn authorize_owner(
    authenticator: &dyn Authenticator,
    videos: &dyn VideoStore,
    request: &IngestRequest,
) -> Result<VideoRecord, IngestError> {
    let video_id = Uuid::parse_str(request.video_id.trim())
        .map_err(|_| IngestError::BadInput("Invalid ID".to_string()))?;

    let auth = authenticator.authenticate(&request.auth).await;
    metrics::record_auth_attempt(auth.is_ok());
    let user_id = auth?.user_id;
    tracing::Span::current().record("user.id", tracing::field::display(user_id));

    let video = videos
        .get_video(video_id)
        .await?
        .ok_or(IngestError::NotFound(video_id))?;

    if !video.is_owned_by(user_id) {
        return Err(IngestError::Forbidden { user_id, video_id });
    }

    Ok(video)
}

/// The `type/subtype` part of a declared content type, lowercased.
///
/// Parameters such as `; codecs=...` are dropped.
pub fn media_type_essence(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

//! Shared test fixtures
//!
//! - JWT token generation
//! - A scriptable media toolkit
//! - Pipeline harness over in-memory stores

#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tubely::auth::jwt::{Claims, JwtAuthenticator};
use tubely::auth::{AuthRequest, Authenticator};
use tubely::ingest::{IngestRequest, IngestSettings, VideoIngestor};
use tubely::media::remux::remux_output_path;
use tubely::media::{Geometry, MediaError, MediaToolkit};
use tubely::metadata::{MemoryVideoStore, VideoRecord, VideoStore};
use tubely::storage::{MemoryObjectStore, ObjectLocation, ObjectStore};
use uuid::Uuid;

/// JWT secret for test tokens
pub const JWT_SECRET: &str = "tubely-test-secret";

pub const TEST_BUCKET: &str = "tubely-test";
pub const TEST_REGION: &str = "us-east-2";

/// Sign an HS256 token for `user_id`, valid for an hour
pub fn token_for(user_id: Uuid) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        iat: Some(chrono::Utc::now().timestamp() as usize),
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn auth_for(user_id: Uuid) -> AuthRequest {
    AuthRequest::with_bearer(&token_for(user_id))
}

pub fn authenticator() -> Arc<dyn Authenticator> {
    Arc::new(JwtAuthenticator::new_hs256(JWT_SECRET))
}

/// Bytes standing in for an MP4 upload
pub fn sample_video(len: usize) -> Vec<u8> {
    let mut data = b"\0\0\0\x18ftypmp42".to_vec();
    data.extend((0..len.saturating_sub(data.len())).map(|i| (i % 251) as u8));
    data
}

/// Entries currently in `dir`
pub fn entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

/// How [`FakeToolkit::remux`] behaves
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemuxMode {
    /// Return the input path unchanged
    Identity,
    /// Write `faststart:` + input to the sibling output path
    Sibling,
    /// Fail like a non-zero ffmpeg exit
    Fail,
}

/// Media toolkit with fixed geometry and scripted remux behavior
pub struct FakeToolkit {
    geometry: Option<Geometry>,
    remux_mode: RemuxMode,
    pub probes: AtomicUsize,
    pub remuxes: AtomicUsize,
}

impl FakeToolkit {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            geometry: Some(Geometry { width, height }),
            remux_mode: RemuxMode::Identity,
            probes: AtomicUsize::new(0),
            remuxes: AtomicUsize::new(0),
        }
    }

    /// Probe reports no usable stream
    pub fn unprobeable() -> Self {
        Self {
            geometry: None,
            ..Self::new(0, 0)
        }
    }

    pub fn with_remux(mut self, mode: RemuxMode) -> Self {
        self.remux_mode = mode;
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn probe(&self, path: &Path) -> Result<Geometry, MediaError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "probe called on a missing file");
        self.geometry.ok_or(MediaError::NoStreams)
    }

    async fn remux(&self, path: &Path) -> Result<PathBuf, MediaError> {
        self.remuxes.fetch_add(1, Ordering::SeqCst);
        match self.remux_mode {
            RemuxMode::Identity => Ok(path.to_path_buf()),
            RemuxMode::Sibling => {
                let output = remux_output_path(path);
                let mut data = b"faststart:".to_vec();
                data.extend(std::fs::read(path).map_err(|e| MediaError::SpawnError {
                    tool: "ffmpeg",
                    source: e,
                })?);
                std::fs::write(&output, data).map_err(|e| MediaError::SpawnError {
                    tool: "ffmpeg",
                    source: e,
                })?;
                Ok(output)
            }
            RemuxMode::Fail => Err(MediaError::NoGeometry),
        }
    }
}

/// An ingestor over in-memory stores with one seeded video
pub struct Harness {
    pub temp: TempDir,
    pub videos: Arc<MemoryVideoStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub media: Arc<FakeToolkit>,
    pub ingestor: VideoIngestor,
    pub owner: Uuid,
    pub video: VideoRecord,
}

impl Harness {
    pub fn new(media: FakeToolkit) -> Self {
        Self::with_limit(media, 1 << 20)
    }

    pub fn with_limit(media: FakeToolkit, max_upload_bytes: u64) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let videos = Arc::new(MemoryVideoStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let media = Arc::new(media);

        let owner = Uuid::new_v4();
        let video = VideoRecord::new(owner, "Boots on the ground");
        videos.insert(video.clone());

        let ingestor = VideoIngestor::new(
            authenticator(),
            Arc::clone(&videos) as Arc<dyn VideoStore>,
            Arc::clone(&objects) as Arc<dyn ObjectStore>,
            Arc::clone(&media) as Arc<dyn MediaToolkit>,
            settings(temp.path(), max_upload_bytes),
        );

        Self {
            temp,
            videos,
            objects,
            media,
            ingestor,
            owner,
            video,
        }
    }

    /// Request for the seeded video, authenticated as its owner
    pub fn owner_request(&self) -> IngestRequest {
        IngestRequest::new(self.video.id.to_string(), auth_for(self.owner))
    }

    pub async fn stored_video(&self) -> VideoRecord {
        self.videos.get_video(self.video.id).await.unwrap().unwrap()
    }

    pub fn staged_files(&self) -> Vec<PathBuf> {
        entries(self.temp.path())
    }
}

pub fn settings(temp_dir: &Path, max_upload_bytes: u64) -> IngestSettings {
    IngestSettings {
        temp_dir: temp_dir.to_path_buf(),
        max_upload_bytes,
        location: ObjectLocation::new(TEST_BUCKET, TEST_REGION),
    }
}

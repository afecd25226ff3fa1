//! Media module
//!
//! Wraps the external `ffprobe`/`ffmpeg` tools behind [`MediaToolkit`] so the
//! ingest pipeline can run against deterministic fakes in tests.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

pub mod orientation;
pub mod probe;
pub mod remux;

pub use orientation::Orientation;

use crate::config::MediaConfig;
use crate::metrics;

/// Media tool errors
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to start {tool}: {source}")]
    SpawnError {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}")]
    ToolFailed {
        tool: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("{tool} timed out after {} seconds", .timeout.as_secs())]
    Timeout {
        tool: &'static str,
        timeout: Duration,
    },

    #[error("Malformed probe output: {0}")]
    MalformedOutput(#[from] serde_json::Error),

    #[error("Probe output contains no streams")]
    NoStreams,

    #[error("No stream carries width and height")]
    NoGeometry,
}

/// Width and height of the first picture-bearing stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn orientation(&self) -> Orientation {
        Orientation::classify(self.width, self.height)
    }
}

/// Media inspection and container rewriting
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Read the stream geometry of the file at `path`
    async fn probe(&self, path: &Path) -> Result<Geometry, MediaError>;

    /// Rewrite `path` with the fast-start layout, returning the output path
    async fn remux(&self, path: &Path) -> Result<PathBuf, MediaError>;
}

/// Toolkit that shells out to `ffprobe` and `ffmpeg`
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FfmpegToolkit {
    pub fn new(ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
            timeout,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(
            config.ffprobe_path.clone(),
            config.ffmpeg_path.clone(),
            config.timeout(),
        )
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, path: &Path) -> Result<Geometry, MediaError> {
        probe::probe_geometry(&self.ffprobe, path, self.timeout).await
    }

    async fn remux(&self, path: &Path) -> Result<PathBuf, MediaError> {
        remux::remux_faststart(&self.ffmpeg, path, self.timeout).await
    }
}

/// Run an external tool to completion, bounded by `timeout`.
///
/// The child is killed if the timeout elapses or the calling future is
/// dropped. A non-zero exit is turned into [`MediaError::ToolFailed`] and its
/// stderr logged here; callers never see it.
pub(crate) async fn run_tool<I, S>(
    tool: &'static str,
    program: &Path,
    args: I,
    timeout: Duration,
) -> Result<Output, MediaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let start = Instant::now();
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| MediaError::SpawnError { tool, source })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| MediaError::SpawnError { tool, source })?,
        Err(_) => {
            tracing::warn!(tool, timeout_secs = timeout.as_secs(), "media tool timed out");
            metrics::record_error("media_timeout");
            return Err(MediaError::Timeout { tool, timeout });
        }
    };

    metrics::record_tool_duration(tool, start.elapsed().as_secs_f64());

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::warn!(tool, status = %output.status, stderr = %stderr, "media tool failed");
        return Err(MediaError::ToolFailed {
            tool,
            status: output.status,
            stderr,
        });
    }

    Ok(output)
}

//! Stream geometry via `ffprobe`

use super::{run_tool, Geometry, MediaError};
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

/// The part of `ffprobe -print_format json -show_streams` output we read
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

/// Probe `path` with the `ffprobe` binary at `ffprobe`
#[tracing::instrument(
    name = "media.probe",
    skip(ffprobe, path, timeout),
    fields(media.width = tracing::field::Empty, media.height = tracing::field::Empty),
    err
)]
pub async fn probe_geometry(
    ffprobe: &Path,
    path: &Path,
    timeout: Duration,
) -> Result<Geometry, MediaError> {
    let args = [
        OsStr::new("-v"),
        OsStr::new("error"),
        OsStr::new("-print_format"),
        OsStr::new("json"),
        OsStr::new("-show_streams"),
        path.as_os_str(),
    ];
    let output = run_tool("ffprobe", ffprobe, args, timeout).await?;
    let geometry = parse_geometry(&output.stdout)?;

    let span = tracing::Span::current();
    span.record("media.width", geometry.width);
    span.record("media.height", geometry.height);

    Ok(geometry)
}

/// Extract the geometry of the first stream that carries one.
///
/// Audio and data streams have no width/height; a file whose first stream is
/// audio still resolves to its video stream.
pub fn parse_geometry(stdout: &[u8]) -> Result<Geometry, MediaError> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;

    if probe.streams.is_empty() {
        return Err(MediaError::NoStreams);
    }

    probe
        .streams
        .iter()
        .find_map(|stream| match (stream.width, stream.height) {
            (Some(width), Some(height)) => Some(Geometry { width, height }),
            _ => None,
        })
        .ok_or(MediaError::NoGeometry)
}

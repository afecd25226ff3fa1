//! Fast-start remux via `ffmpeg`
//!
//! Streams are copied verbatim (`-c copy`); only the container layout
//! changes, with the `moov` index moved ahead of the sample data.

use super::{run_tool, MediaError};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Suffix appended to the input path to name the remux output
pub const REMUX_SUFFIX: &str = ".processing";

/// Sibling path the remuxed copy of `input` is written to
pub fn remux_output_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(REMUX_SUFFIX);
    PathBuf::from(name)
}

/// Arguments for a stream-copy remux of `input` into `output`
pub fn remux_args<'a>(input: &'a Path, output: &'a Path) -> Vec<&'a OsStr> {
    vec![
        OsStr::new("-y"),
        OsStr::new("-v"),
        OsStr::new("error"),
        OsStr::new("-i"),
        input.as_os_str(),
        OsStr::new("-c"),
        OsStr::new("copy"),
        OsStr::new("-movflags"),
        OsStr::new("faststart"),
        // Output name has no .mp4 extension, so the muxer must be explicit
        OsStr::new("-f"),
        OsStr::new("mp4"),
        output.as_os_str(),
    ]
}

/// Remux `input` with the `ffmpeg` binary at `ffmpeg`
#[tracing::instrument(name = "media.remux", skip(ffmpeg, input, timeout), err)]
pub async fn remux_faststart(
    ffmpeg: &Path,
    input: &Path,
    timeout: Duration,
) -> Result<PathBuf, MediaError> {
    let output = remux_output_path(input);
    let result = run_tool("ffmpeg", ffmpeg, remux_args(input, &output), timeout).await;

    if let Err(e) = result {
        // ffmpeg may leave a partial file behind
        if let Err(remove_err) = tokio::fs::remove_file(&output).await {
            if remove_err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %output.display(),
                    error = %remove_err,
                    "Failed to remove partial remux output"
                );
            }
        }
        return Err(e);
    }

    Ok(output)
}

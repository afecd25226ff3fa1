//! FFmpeg Toolkit Tests
//!
//! Runs the real `ffprobe`/`ffmpeg` binaries when they are installed; each
//! test returns early otherwise.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tubely::media::{FfmpegToolkit, MediaError, MediaToolkit, Orientation};

fn tools_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool)
            .arg("-version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    })
}

fn toolkit() -> FfmpegToolkit {
    FfmpegToolkit::new("ffprobe", "ffmpeg", Duration::from_secs(60))
}

/// Encode a one second test pattern; the default mp4 muxer puts `moov` last
fn make_clip(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join(format!("clip-{}x{}.mp4", width, height));
    let status = Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size={}x{}:rate=10:duration=1", width, height))
        .args(["-c:v", "mpeg4", "-f", "mp4"])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());
    path
}

fn atom_offset(data: &[u8], atom: &[u8; 4]) -> Option<usize> {
    data.windows(4).position(|w| w == atom)
}

#[tokio::test]
async fn test_probe_reads_geometry() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let clip = make_clip(dir.path(), 320, 568);

    let geometry = toolkit().probe(&clip).await.unwrap();

    assert_eq!((geometry.width, geometry.height), (320, 568));
    assert_eq!(geometry.orientation(), Orientation::Portrait);
}

#[tokio::test]
async fn test_remux_moves_index_to_front() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let clip = make_clip(dir.path(), 640, 360);

    let output = toolkit().remux(&clip).await.unwrap();

    assert_ne!(output, clip);
    assert_eq!(output.parent(), clip.parent());
    assert!(clip.exists(), "input must be left in place");

    let data = std::fs::read(&output).unwrap();
    let moov = atom_offset(&data, b"moov").unwrap();
    let mdat = atom_offset(&data, b"mdat").unwrap();
    assert!(moov < mdat, "moov at {} should precede mdat at {}", moov, mdat);

    let geometry = toolkit().probe(&output).await.unwrap();
    assert_eq!(geometry.orientation(), Orientation::Landscape);
}

#[tokio::test]
async fn test_probe_rejects_non_media() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.mp4");
    std::fs::write(&path, b"definitely not a video").unwrap();

    let result = toolkit().probe(&path).await;
    assert!(matches!(result, Err(MediaError::ToolFailed { tool: "ffprobe", .. })));
}

#[tokio::test]
async fn test_failed_remux_leaves_no_output() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.mp4");
    std::fs::write(&path, b"definitely not a video").unwrap();

    let result = toolkit().remux(&path).await;

    assert!(matches!(result, Err(MediaError::ToolFailed { tool: "ffmpeg", .. })));
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path() != path)
        .collect();
    assert!(leftovers.is_empty());
}

//! Media probing with a format-level and a decode-level strategy.
//!
//! The fast path reads container/stream metadata from `ffprobe`. When
//! that fails or yields incomplete values (zero fps, duration or frame
//! count) the slow path decodes the stream with `ffprobe -count_frames`
//! and takes geometry, fps and the frame-accurate count straight from
//! the decoder. Only when both layers fail does probing error out, and
//! the error carries both layers' messages.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use vmix_models::VideoAsset;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output for the format-level probe.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    nb_frames: Option<String>,
    /// Present only with `-count_frames`
    nb_read_frames: Option<String>,
}

impl FfprobeStream {
    fn is_video(&self) -> bool {
        self.codec_type.as_deref() == Some("video")
    }

    fn fps(&self) -> Option<f64> {
        self.avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .filter(|fps| *fps > 0.0)
            .or_else(|| {
                self.r_frame_rate
                    .as_deref()
                    .and_then(parse_frame_rate)
                    .filter(|fps| *fps > 0.0)
            })
    }
}

/// Probe a video file.
///
/// Fails with [`MediaError::MissingAsset`] when the file does not
/// exist and with [`MediaError::Probe`] when neither strategy could
/// produce complete metadata.
pub async fn probe(path: impl AsRef<Path>) -> MediaResult<VideoAsset> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::MissingAsset(path.to_path_buf()));
    }

    check_ffprobe()?;

    let format_error = match format_probe(path).await {
        Ok(asset) => {
            debug!(
                "Format probe: {}x{} @ {:.2}fps, {:.2}s, {} frames",
                asset.width, asset.height, asset.fps, asset.duration, asset.frame_count
            );
            return Ok(asset);
        }
        Err(e) => e.to_string(),
    };

    warn!(
        "Format probe failed for {} ({}), falling back to decode probe",
        path.display(),
        format_error
    );

    match decode_probe(path).await {
        Ok(asset) => {
            debug!(
                "Decode probe: {}x{} @ {:.2}fps, {:.2}s, {} frames",
                asset.width, asset.height, asset.fps, asset.duration, asset.frame_count
            );
            Ok(asset)
        }
        Err(e) => Err(MediaError::Probe {
            path: path.to_path_buf(),
            format_error,
            decode_error: e.to_string(),
        }),
    }
}

/// Fast path: container/stream metadata only.
async fn format_probe(path: &Path) -> MediaResult<VideoAsset> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::InvalidVideo(format!(
            "ffprobe exited with status {:?}: {}",
            output.status.code(),
            crate::command::stderr_tail(&output.stderr)
        )));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    asset_from_format_probe(path, &probe)
}

/// Slow path: open the stream and count frames in the decoder.
async fn decode_probe(path: &Path) -> MediaResult<VideoAsset> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-count_frames",
            "-select_streams",
            "v:0",
            "-print_format",
            "json",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::InvalidVideo(format!(
            "ffprobe -count_frames exited with status {:?}: {}",
            output.status.code(),
            crate::command::stderr_tail(&output.stderr)
        )));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    asset_from_decode_probe(path, &probe)
}

/// Build an asset from format-level metadata.
///
/// Frame count prefers the container's explicit `nb_frames`, else
/// derives `round(duration * fps)`. Any zero field is a failure.
fn asset_from_format_probe(path: &Path, probe: &FfprobeOutput) -> MediaResult<VideoAsset> {
    let stream = probe
        .streams
        .iter()
        .find(|s| s.is_video())
        .ok_or_else(|| MediaError::InvalidVideo("no video stream found".to_string()))?;

    let fps = stream.fps().unwrap_or(0.0);

    // Stream-level duration first, container-level second.
    let duration = stream
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            probe
                .format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(|d| d.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| {
            if duration > 0.0 && fps > 0.0 {
                (duration * fps).round() as u64
            } else {
                0
            }
        });

    let asset = VideoAsset {
        path: path.to_path_buf(),
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps,
        duration,
        frame_count,
    };

    if !asset.is_complete() {
        return Err(MediaError::InvalidVideo(
            "format metadata incomplete (zero fps, duration or frame count)".to_string(),
        ));
    }

    Ok(asset)
}

/// Build an asset from decode-level metadata (`-count_frames`).
///
/// Duration is derived as `frame_count / fps`.
fn asset_from_decode_probe(path: &Path, probe: &FfprobeOutput) -> MediaResult<VideoAsset> {
    let stream = probe
        .streams
        .iter()
        .find(|s| s.is_video() || s.codec_type.is_none())
        .ok_or_else(|| MediaError::InvalidVideo("no video stream found".to_string()))?;

    let fps = stream.fps().unwrap_or(0.0);

    let frame_count = stream
        .nb_read_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(0);

    let duration = if fps > 0.0 {
        frame_count as f64 / fps
    } else {
        0.0
    };

    let asset = VideoAsset {
        path: path.to_path_buf(),
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps,
        duration,
        frame_count,
    };

    if !asset.is_complete() {
        return Err(MediaError::InvalidVideo(
            "decoder yielded incomplete metadata (zero fps or frame count)".to_string(),
        ));
    }

    Ok(asset)
}

/// Parse a frame rate string (e.g. "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

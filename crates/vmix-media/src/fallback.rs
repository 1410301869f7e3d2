//! Single-pass filter-graph transcode.
//!
//! Used when no cover asset exists or the mixing path failed. Applies
//! geometric normalization plus light randomized perturbation in one
//! ffmpeg invocation; nothing here touches raw frame pipes.

use std::path::Path;
use tracing::info;

use vmix_models::encoding::{AUDIO_BITRATE, AUDIO_CODEC, SOFTWARE_ENCODER};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{build_fallback_filter, FallbackJitter};

/// Fallback output geometry (portrait).
pub const FALLBACK_WIDTH: u32 = 1080;
pub const FALLBACK_HEIGHT: u32 = 1920;
/// Fallback output frame rate and GOP length.
pub const FALLBACK_FPS: u32 = 30;
pub const FALLBACK_GOP: u32 = 60;
/// Fallback rate control.
pub const FALLBACK_BITRATE: &str = "3500k";
pub const FALLBACK_MAXRATE: &str = "4000k";
pub const FALLBACK_BUFSIZE: &str = "8000k";

/// Transcode `input` to `output` with fresh randomized jitter.
pub async fn fallback_transcode(input: &Path, output: &Path) -> MediaResult<()> {
    let jitter = FallbackJitter::sample(&mut rand::rng());
    fallback_transcode_with(input, output, &jitter).await
}

/// Transcode with explicit jitter parameters.
pub async fn fallback_transcode_with(
    input: &Path,
    output: &Path,
    jitter: &FallbackJitter,
) -> MediaResult<()> {
    if !input.exists() {
        return Err(MediaError::MissingAsset(input.to_path_buf()));
    }

    info!(
        "Fallback transcode: {} -> {} (speed {:.3}, pitch {:.4})",
        input.display(),
        output.display(),
        jitter.speed,
        jitter.pitch_factor
    );

    let cmd = FfmpegCommand::new(input, output)
        .filter_complex(build_fallback_filter(jitter, FALLBACK_WIDTH, FALLBACK_HEIGHT))
        .output_arg("-map")
        .output_arg("[vout]")
        .output_arg("-map")
        .output_arg("[aout]")
        .frame_rate(FALLBACK_FPS)
        .output_arg("-g")
        .output_arg(FALLBACK_GOP.to_string())
        .video_codec(SOFTWARE_ENCODER)
        .output_arg("-preset")
        .output_arg("veryfast")
        .output_arg("-b:v")
        .output_arg(FALLBACK_BITRATE)
        .output_arg("-maxrate")
        .output_arg(FALLBACK_MAXRATE)
        .output_arg("-bufsize")
        .output_arg(FALLBACK_BUFSIZE)
        .audio_codec(AUDIO_CODEC)
        .audio_bitrate(AUDIO_BITRATE)
        .output_arg("-movflags")
        .output_arg("+faststart");

    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_input_rejected() {
        let result =
            fallback_transcode(Path::new("/nonexistent/in.mp4"), Path::new("/tmp/out.mp4")).await;
        assert!(matches!(result, Err(MediaError::MissingAsset(_))));
    }
}

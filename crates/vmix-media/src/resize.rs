//! Cover geometry adapter.
//!
//! Re-encodes the cover video to the primary's exact geometry before
//! mixing. The copy only feeds the interleaver, so both codec paths
//! target visually lossless output.

use std::path::Path;
use tracing::info;

use vmix_models::encoding::{
    AUDIO_BITRATE, AUDIO_CODEC, HARDWARE_ENCODER, HARDWARE_PRESET, RESIZE_QUALITY,
    SOFTWARE_ENCODER,
};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::scale_pad_filter;

/// Re-encode `input` to exactly `target_w x target_h`.
///
/// Scales preserving aspect ratio and pads with black; never crops.
/// Fails with [`MediaError::EncodeFailed`] on a non-zero encoder exit
/// or when the output artifact is missing afterwards.
pub async fn resize_to_geometry(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    target_w: u32,
    target_h: u32,
    use_gpu: bool,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::MissingAsset(input.to_path_buf()));
    }

    info!(
        "Resizing {} -> {} ({}x{}, gpu: {})",
        input.display(),
        output.display(),
        target_w,
        target_h,
        use_gpu
    );

    let mut cmd = FfmpegCommand::new(input, output)
        .video_filter(scale_pad_filter(target_w, target_h));

    // Quality-factor mode for NVENC, constant-rate-factor for libx264.
    cmd = if use_gpu {
        cmd.video_codec(HARDWARE_ENCODER)
            .output_arg("-preset")
            .output_arg(HARDWARE_PRESET)
            .output_arg("-cq")
            .output_arg(RESIZE_QUALITY.to_string())
    } else {
        cmd.video_codec(SOFTWARE_ENCODER)
            .output_arg("-crf")
            .output_arg(RESIZE_QUALITY.to_string())
    };

    cmd = cmd.audio_codec(AUDIO_CODEC).audio_bitrate(AUDIO_BITRATE);

    FfmpegRunner::new().run(&cmd).await
}

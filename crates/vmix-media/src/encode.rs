//! Final encode: audio mux and the size-guard second pass.

use std::path::Path;
use tracing::{info, warn};

use vmix_models::encoding::{
    AUDIO_BITRATE, AUDIO_CODEC, HARDWARE_ENCODER, HARDWARE_PRESET, MIX_CRF, SIZE_GUARD_CRF,
    SIZE_GUARD_LIMIT_BYTES, SOFTWARE_ENCODER,
};
use vmix_models::{EncodingProfile, OutputCadence};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::fs_utils::replace_file;

/// Video codec and rate-control arguments for one encoding pass.
///
/// NVENC runs in target-bitrate mode; libx264 keeps a CRF constraint
/// with the profile's peak cap.
pub(crate) fn quality_args(
    profile: &EncodingProfile,
    use_gpu: bool,
    software_crf: u8,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-c:v".into()];
    if use_gpu {
        args.push(HARDWARE_ENCODER.into());
        args.push("-preset".into());
        args.push(HARDWARE_PRESET.into());
        args.push("-b:v".into());
        args.push(profile.bitrate.clone());
    } else {
        args.push(SOFTWARE_ENCODER.into());
        args.push("-crf".into());
        args.push(software_crf.to_string());
    }
    args.push("-maxrate".into());
    args.push(profile.max_bitrate.clone());
    args.push("-bufsize".into());
    args.push(profile.buffer_size.clone());
    args
}

/// Quality arguments for the mixing passes (writer and mux).
pub(crate) fn mix_quality_args(profile: &EncodingProfile, use_gpu: bool) -> Vec<String> {
    quality_args(profile, use_gpu, MIX_CRF)
}

/// Mux the raw-encoded intermediate with the primary's audio track.
///
/// The bitrate profile is selected from the primary's duration, the
/// stream is trimmed to the shorter of the two inputs (`-shortest`)
/// and emitted at the output cadence. After muxing the size guard may
/// run a second, lower-bitrate pass; its failure is non-fatal.
pub async fn finalize(
    raw_intermediate: &Path,
    primary_for_audio: &Path,
    primary_duration: f64,
    output: &Path,
    use_gpu: bool,
    cadence: OutputCadence,
) -> MediaResult<()> {
    let profile = EncodingProfile::for_duration(primary_duration);
    info!(
        "Muxing {} + audio of {} -> {} ({}, {})",
        raw_intermediate.display(),
        primary_for_audio.display(),
        output.display(),
        profile.bitrate,
        cadence
    );

    let cmd = FfmpegCommand::new(raw_intermediate, output)
        .extra_input(primary_for_audio)
        .output_args(mix_quality_args(&profile, use_gpu))
        .frame_rate(cadence.as_u32())
        .pixel_format("yuv420p")
        .audio_codec(AUDIO_CODEC)
        .audio_bitrate(AUDIO_BITRATE)
        .output_arg("-shortest");

    FfmpegRunner::new().run(&cmd).await?;

    if let Err(e) = apply_size_guard(output, use_gpu, cadence).await {
        // Keep the oversized but valid first-pass output.
        warn!("size-guard pass failed, keeping first-pass output: {}", e);
    }

    Ok(())
}

/// Re-compress `output` at a fixed low profile when it exceeds the
/// size ceiling, atomically replacing it. Returns whether a second
/// pass ran.
pub async fn apply_size_guard(
    output: &Path,
    use_gpu: bool,
    cadence: OutputCadence,
) -> MediaResult<bool> {
    let size = tokio::fs::metadata(output).await?.len();
    if size <= SIZE_GUARD_LIMIT_BYTES {
        return Ok(false);
    }

    warn!(
        "Output is {} bytes (> {} limit), running size-guard pass",
        size, SIZE_GUARD_LIMIT_BYTES
    );

    let compressed = guard_pass_path(output);
    let profile = EncodingProfile::size_guard();

    let cmd = FfmpegCommand::new(output, &compressed)
        .output_args(quality_args(&profile, use_gpu, SIZE_GUARD_CRF))
        .frame_rate(cadence.as_u32())
        .pixel_format("yuv420p")
        .audio_codec(AUDIO_CODEC)
        .audio_bitrate(AUDIO_BITRATE);

    if let Err(e) = FfmpegRunner::new().run(&cmd).await {
        // Never leave the partial pass lying around.
        let _ = tokio::fs::remove_file(&compressed).await;
        return Err(e);
    }

    // Same directory as the output, so the rename is atomic.
    replace_file(&compressed, output).await?;
    info!("Size-guard pass replaced {}", output.display());
    Ok(true)
}

/// Sibling path for the size-guard intermediate.
fn guard_pass_path(output: &Path) -> std::path::PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{stem}_compressed.mp4"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_quality_args_software() {
        let profile = EncodingProfile::for_duration(10.0);
        let args = quality_args(&profile, false, MIX_CRF);
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"-crf".to_string()));
        assert!(args.contains(&"20".to_string()));
        assert!(args.contains(&"9000k".to_string()));
        assert!(!args.contains(&"-b:v".to_string()));
    }

    #[test]
    fn test_quality_args_hardware() {
        let profile = EncodingProfile::for_duration(40.0);
        let args = quality_args(&profile, true, MIX_CRF);
        assert!(args.contains(&"h264_nvenc".to_string()));
        assert!(args.contains(&"p6".to_string()));
        assert!(args.contains(&"4500k".to_string()));
        assert!(!args.contains(&"-crf".to_string()));
    }

    #[test]
    fn test_guard_pass_path_is_sibling() {
        let p = guard_pass_path(&PathBuf::from("/out/video_mixed.mp4"));
        assert_eq!(p, PathBuf::from("/out/video_mixed_compressed.mp4"));
    }

    #[tokio::test]
    async fn test_size_guard_skips_small_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.mp4");
        tokio::fs::write(&path, b"tiny").await.unwrap();

        let ran = apply_size_guard(&path, false, OutputCadence::Fps60)
            .await
            .unwrap();
        assert!(!ran);
    }
}

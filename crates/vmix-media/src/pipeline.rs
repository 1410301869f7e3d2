//! Pipeline orchestrator.
//!
//! Decides per invocation whether the mixing path applies and runs it,
//! falling back to the single-pass transcode on any mixing failure.
//! `process` never fails: the worst case returns the input path
//! unchanged, so callers are never blocked by this subsystem.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use vmix_models::{EncodingProfile, MixPlan, PipelineConfig, VideoAsset};

use crate::command::check_ffmpeg;
use crate::encode::finalize;
use crate::error::MediaResult;
use crate::fallback::fallback_transcode;
use crate::frames::RawFrameSink;
use crate::mixer::mix_streams;
use crate::probe::probe;
use crate::resize::resize_to_geometry;

/// Cover candidate locations, relative to the project root, probed in
/// order when the config does not pin a cover explicitly.
pub const COVER_CANDIDATES: [&str; 3] = [
    "video_processing/cover.mp4",
    "videos/cover.mp4",
    "media/cover.mp4",
];

/// Which path an invocation takes. Each failure mode of the mixing
/// path maps onto a named transition instead of a generic catch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixDecision {
    /// Feature off: the input passes through untouched.
    Disabled,
    /// Feature on but no cover asset found: fallback transcode.
    NoCover,
    /// Cover located: run the full mixing path.
    Mix(PathBuf),
}

/// The frame-mixing pipeline.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Build a pipeline from an explicit configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Decide which path applies for the current configuration.
    pub fn decide(&self) -> MixDecision {
        if !self.config.enabled {
            return MixDecision::Disabled;
        }
        match self.locate_cover() {
            Some(cover) => MixDecision::Mix(cover),
            None => MixDecision::NoCover,
        }
    }

    /// Find the cover video: explicit config path first, then the
    /// ordered candidate list under the project root.
    fn locate_cover(&self) -> Option<PathBuf> {
        if let Some(cover) = &self.config.cover_video {
            if cover.exists() {
                return Some(cover.clone());
            }
            warn!("configured cover video {} does not exist", cover.display());
        }
        COVER_CANDIDATES
            .iter()
            .map(|candidate| self.config.project_root.join(candidate))
            .find(|path| path.exists())
    }

    /// Process one input video.
    ///
    /// Returns the mixed output, the fallback-transcoded output, or
    /// the input path unchanged. This method never fails; every error
    /// inside degrades to a simpler path.
    pub async fn process(&self, input: &Path) -> PathBuf {
        if check_ffmpeg().is_err() {
            warn!("ffmpeg not found, returning input unchanged");
            return input.to_path_buf();
        }

        match self.decide() {
            MixDecision::Disabled => {
                info!("mixing disabled, returning input unchanged");
                input.to_path_buf()
            }
            MixDecision::NoCover => {
                warn!("no cover asset found, using fallback transcode");
                self.run_fallback(input).await
            }
            MixDecision::Mix(cover) => {
                let output = self.output_path(input, "mixed");
                match self.run_mix(input, &cover, &output).await {
                    Ok(()) => {
                        info!("mix pipeline complete -> {}", output.display());
                        output
                    }
                    Err(e) => {
                        warn!("mix pipeline failed ({}), using fallback transcode", e);
                        self.run_fallback(input).await
                    }
                }
            }
        }
    }

    /// Run the fallback transcode; on failure return the input path.
    async fn run_fallback(&self, input: &Path) -> PathBuf {
        let output = self.output_path(input, "fallback");
        match fallback_transcode(input, &output).await {
            Ok(()) => {
                info!("fallback transcode complete -> {}", output.display());
                output
            }
            Err(e) => {
                warn!("fallback transcode failed ({}), returning input unchanged", e);
                input.to_path_buf()
            }
        }
    }

    /// The full mixing sequence: probe, adapt geometry, plan, mix,
    /// mux, size guard. All intermediates live in a per-invocation
    /// temp workspace removed on every exit path.
    async fn run_mix(&self, input: &Path, cover: &Path, output: &Path) -> MediaResult<()> {
        let workspace = tempfile::Builder::new().prefix("vmix-").tempdir()?;

        let primary = probe(input).await?;
        info!(
            "primary: {}x{} @ {:.2}fps, {:.2}s, {} frames",
            primary.width, primary.height, primary.fps, primary.duration, primary.frame_count
        );
        let cover_asset = probe(cover).await?;
        info!("cover: {}x{}", cover_asset.width, cover_asset.height);

        let cover_to_mix = self
            .adapt_cover_geometry(&primary, &cover_asset, workspace.path())
            .await?;

        let plan = MixPlan::for_primary(self.config.output_fps, &primary);
        let profile = EncodingProfile::for_duration(primary.duration);

        let raw_intermediate = workspace.path().join("mixed_raw.mp4");
        let mut sink = RawFrameSink::open(
            &raw_intermediate,
            primary.width,
            primary.height,
            plan.cadence,
            &profile,
            self.config.use_gpu,
        )?;

        let outcome = mix_streams(&primary, &cover_to_mix, &plan, &mut sink).await?;
        sink.finish().await?;

        if outcome.truncated {
            warn!(
                "output truncated: {} of {} planned frames",
                outcome.frames_written, plan.total_output_frames
            );
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        finalize(
            &raw_intermediate,
            input,
            primary.duration,
            output,
            self.config.use_gpu,
            plan.cadence,
        )
        .await
    }

    /// Resize the cover into the workspace when its geometry differs
    /// from the primary's; otherwise use it as-is.
    async fn adapt_cover_geometry(
        &self,
        primary: &VideoAsset,
        cover: &VideoAsset,
        workspace: &Path,
    ) -> MediaResult<PathBuf> {
        if cover.same_geometry(primary) {
            info!("cover geometry matches primary, skipping resize");
            return Ok(cover.path.clone());
        }
        let resized = workspace.join("cover_resized.mp4");
        resize_to_geometry(
            &cover.path,
            &resized,
            primary.width,
            primary.height,
            self.config.use_gpu,
        )
        .await?;
        Ok(resized)
    }

    /// Output path: `{stem}_{suffix}.mp4` in the configured output
    /// directory, defaulting to the input's directory.
    fn output_path(&self, input: &Path, suffix: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        let dir = self
            .config
            .output_dir
            .clone()
            .or_else(|| input.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        dir.join(format!("{stem}_{suffix}.mp4"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, root: &Path) -> PipelineConfig {
        PipelineConfig {
            enabled,
            project_root: root.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_decide_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(false, dir.path()));
        assert_eq!(pipeline.decide(), MixDecision::Disabled);
    }

    #[test]
    fn test_decide_no_cover() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(true, dir.path()));
        assert_eq!(pipeline.decide(), MixDecision::NoCover);
    }

    #[test]
    fn test_decide_finds_candidate_cover() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join("videos").join("cover.mp4");
        std::fs::create_dir_all(cover.parent().unwrap()).unwrap();
        std::fs::write(&cover, b"stub").unwrap();

        let pipeline = Pipeline::new(config(true, dir.path()));
        assert_eq!(pipeline.decide(), MixDecision::Mix(cover));
    }

    #[test]
    fn test_decide_prefers_explicit_cover() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("my_cover.mp4");
        std::fs::write(&explicit, b"stub").unwrap();

        let mut cfg = config(true, dir.path());
        cfg.cover_video = Some(explicit.clone());
        let pipeline = Pipeline::new(cfg);
        assert_eq!(pipeline.decide(), MixDecision::Mix(explicit));
    }

    #[test]
    fn test_decide_candidate_order() {
        let dir = tempfile::tempdir().unwrap();
        for candidate in COVER_CANDIDATES {
            let path = dir.path().join(candidate);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"stub").unwrap();
        }

        let pipeline = Pipeline::new(config(true, dir.path()));
        assert_eq!(
            pipeline.decide(),
            MixDecision::Mix(dir.path().join(COVER_CANDIDATES[0]))
        );
    }

    #[tokio::test]
    async fn test_process_disabled_returns_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"stub").unwrap();

        let pipeline = Pipeline::new(config(false, dir.path()));
        assert_eq!(pipeline.process(&input).await, input);
    }

    #[test]
    fn test_output_path_uses_input_dir_by_default() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        let out = pipeline.output_path(Path::new("/videos/clip.mp4"), "mixed");
        assert_eq!(out, PathBuf::from("/videos/clip_mixed.mp4"));
    }

    #[test]
    fn test_output_path_honors_output_dir() {
        let mut cfg = PipelineConfig::default();
        cfg.output_dir = Some(PathBuf::from("/out"));
        let pipeline = Pipeline::new(cfg);
        let out = pipeline.output_path(Path::new("/videos/clip.mp4"), "mixed");
        assert_eq!(out, PathBuf::from("/out/clip_mixed.mp4"));
    }
}

//! FFmpeg CLI wrapper implementing the AB frame-mixing pipeline.
//!
//! This crate provides:
//! - Two-layer media probing (format metadata, decode-accurate fallback)
//! - Cover geometry adaptation (scale + pad, never crop)
//! - Raw-frame pipe streaming with a cyclic cover source
//! - Duration-tiered final encode with a size-guard second pass
//! - An orchestrator that degrades to a filter-graph transcode and,
//!   failing that, to the untouched input path

pub mod command;
pub mod encode;
pub mod error;
pub mod fallback;
pub mod filters;
pub mod frames;
pub mod fs_utils;
pub mod mixer;
pub mod pipeline;
pub mod probe;
pub mod resize;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use encode::{apply_size_guard, finalize};
pub use error::{MediaError, MediaResult};
pub use fallback::fallback_transcode;
pub use frames::{CyclicFrameSource, RawFrameSink, RawFrameSource};
pub use mixer::{mix_streams, MixOutcome};
pub use pipeline::{MixDecision, Pipeline, COVER_CANDIDATES};
pub use probe::probe;
pub use resize::resize_to_geometry;

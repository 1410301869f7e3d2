//! Probed video asset metadata.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata for a probed video file.
///
/// Produced by the media probe and treated as read-only by the rest of
/// the pipeline. A probe that cannot fill every field with a non-zero
/// value is a failure, never a degenerate `VideoAsset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAsset {
    /// Path the asset was probed from
    pub path: PathBuf,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (rational reduced to a float)
    pub fps: f64,
    /// Duration in seconds
    pub duration: f64,
    /// Total number of video frames
    pub frame_count: u64,
}

impl VideoAsset {
    /// Whether every probed field carries a usable value.
    ///
    /// `width`/`height` must be positive and `fps`, `duration` and
    /// `frame_count` must all be non-zero.
    pub fn is_complete(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.fps > 0.0
            && self.duration > 0.0
            && self.frame_count > 0
    }

    /// Whether this asset has the same pixel geometry as `other`.
    pub fn same_geometry(&self, other: &VideoAsset) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Size of one raw BGR24 frame of this asset, in bytes.
    pub fn raw_frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

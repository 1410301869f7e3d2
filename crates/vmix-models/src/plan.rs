//! Frame-position planning for the mixed output stream.
//!
//! The planner decides, for each frame of the primary video, which slot
//! of the re-encoded output it occupies. Every slot not claimed by the
//! primary is filled from the cover stream. The spacing per cadence is
//! a hard contract: it fixes the fraction of output frames sourced from
//! the cover, which is the fingerprint-perturbation strength.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::video::VideoAsset;

/// Interval cycle used by the 240 fps cadence after the first two slots.
const FPS240_INTERVALS: [u64; 3] = [8, 9, 7];

/// Errors produced while building a mix plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("unsupported output cadence: {0} fps (supported: 60, 120, 240)")]
    UnsupportedCadence(u32),
}

/// Supported output frame cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum OutputCadence {
    Fps60,
    Fps120,
    Fps240,
}

impl OutputCadence {
    /// Cadence as a plain frame rate.
    pub fn as_u32(self) -> u32 {
        match self {
            OutputCadence::Fps60 => 60,
            OutputCadence::Fps120 => 120,
            OutputCadence::Fps240 => 240,
        }
    }

    /// Fraction of output slots sourced from the cover stream.
    pub fn cover_fraction(self) -> f64 {
        match self {
            OutputCadence::Fps60 => 0.5,
            OutputCadence::Fps120 => 0.75,
            OutputCadence::Fps240 => 0.875,
        }
    }
}

impl TryFrom<u32> for OutputCadence {
    type Error = PlanError;

    fn try_from(fps: u32) -> Result<Self, Self::Error> {
        match fps {
            60 => Ok(OutputCadence::Fps60),
            120 => Ok(OutputCadence::Fps120),
            240 => Ok(OutputCadence::Fps240),
            other => Err(PlanError::UnsupportedCadence(other)),
        }
    }
}

impl From<OutputCadence> for u32 {
    fn from(c: OutputCadence) -> u32 {
        c.as_u32()
    }
}

impl std::fmt::Display for OutputCadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}fps", self.as_u32())
    }
}

/// Compute the output slot index for each primary frame.
///
/// Returns one slot per primary frame, strictly increasing. The result
/// is fully deterministic.
///
/// Placement rules:
/// - 60 fps: slot `m` for `m <= 2`, then `2 + 2(m - 2)`
/// - 120 fps: slot `m` for `m <= 1`, then `1 + 4(m - 1)`
/// - 240 fps: slots 0 and 1, then each slot advances from the previous
///   by the repeating interval cycle `[8, 9, 7]`
pub fn plan_positions(cadence: OutputCadence, primary_frame_count: u64) -> Vec<u64> {
    let n = primary_frame_count;
    match cadence {
        OutputCadence::Fps60 => (0..n)
            .map(|m| if m <= 2 { m } else { 2 + 2 * (m - 2) })
            .collect(),
        OutputCadence::Fps120 => (0..n)
            .map(|m| if m <= 1 { m } else { 1 + 4 * (m - 1) })
            .collect(),
        OutputCadence::Fps240 => {
            let mut positions: Vec<u64> = (0..n.min(2)).collect();
            let mut next = 1u64;
            for m in 2..n {
                next += FPS240_INTERVALS[((m - 2) % 3) as usize];
                positions.push(next);
            }
            positions
        }
    }
}

/// A fully derived mix plan for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixPlan {
    /// Output frame cadence
    pub cadence: OutputCadence,
    /// Total slots in the output stream: `floor(duration * cadence)`
    pub total_output_frames: u64,
    /// Output slot index for each primary frame, strictly increasing
    pub primary_positions: Vec<u64>,
}

impl MixPlan {
    /// Build the plan for a probed primary asset.
    pub fn for_primary(cadence: OutputCadence, primary: &VideoAsset) -> Self {
        let total_output_frames = (primary.duration * f64::from(cadence.as_u32())) as u64;
        let primary_positions = plan_positions(cadence, primary.frame_count);
        Self {
            cadence,
            total_output_frames,
            primary_positions,
        }
    }

    /// Number of primary frames the plan accounts for.
    pub fn primary_frame_count(&self) -> u64 {
        self.primary_positions.len() as u64
    }

    /// Cursor over the output slots in order.
    pub fn cursor(&self) -> PlanCursor<'_> {
        PlanCursor {
            positions: &self.primary_positions,
            next_idx: 0,
            slot: 0,
            total: self.total_output_frames,
        }
    }
}

/// Which stream fills a given output slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    Primary,
    Cover,
}

/// Ordered walk over the output slots of a [`MixPlan`].
///
/// Yields exactly `total_output_frames` decisions; membership checks
/// are O(1) because `primary_positions` is strictly increasing.
#[derive(Debug, Clone)]
pub struct PlanCursor<'a> {
    positions: &'a [u64],
    next_idx: usize,
    slot: u64,
    total: u64,
}

impl Iterator for PlanCursor<'_> {
    type Item = SlotSource;

    fn next(&mut self) -> Option<SlotSource> {
        if self.slot >= self.total {
            return None;
        }
        let source = if self.positions.get(self.next_idx) == Some(&self.slot) {
            self.next_idx += 1;
            SlotSource::Primary
        } else {
            SlotSource::Cover
        };
        self.slot += 1;
        Some(source)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.slot) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PlanCursor<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn assert_strictly_increasing(positions: &[u64]) {
        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1], "not strictly increasing: {:?}", pair);
        }
    }

    #[test]
    fn test_positions_60fps() {
        let positions = plan_positions(OutputCadence::Fps60, 8);
        assert_eq!(positions, vec![0, 1, 2, 4, 6, 8, 10, 12]);
    }

    #[test]
    fn test_positions_120fps() {
        let positions = plan_positions(OutputCadence::Fps120, 6);
        assert_eq!(positions, vec![0, 1, 5, 9, 13, 17]);
    }

    #[test]
    fn test_positions_240fps_interval_cycle() {
        // 0, 1, then previous + 8, 9, 7 repeating
        let positions = plan_positions(OutputCadence::Fps240, 9);
        assert_eq!(positions, vec![0, 1, 9, 18, 25, 33, 42, 49, 57]);
    }

    #[test]
    fn test_positions_240fps_small_counts() {
        assert!(plan_positions(OutputCadence::Fps240, 0).is_empty());
        assert_eq!(plan_positions(OutputCadence::Fps240, 1), vec![0]);
        assert_eq!(plan_positions(OutputCadence::Fps240, 2), vec![0, 1]);
    }

    #[test]
    fn test_one_slot_per_primary_frame() {
        for cadence in [
            OutputCadence::Fps60,
            OutputCadence::Fps120,
            OutputCadence::Fps240,
        ] {
            for n in [0u64, 1, 2, 3, 10, 300, 1000] {
                let positions = plan_positions(cadence, n);
                assert_eq!(positions.len() as u64, n, "{cadence} n={n}");
                assert_strictly_increasing(&positions);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let a = plan_positions(OutputCadence::Fps240, 500);
        let b = plan_positions(OutputCadence::Fps240, 500);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cadence_rejects_unsupported() {
        assert!(OutputCadence::try_from(60).is_ok());
        assert!(OutputCadence::try_from(30).is_err());
        assert!(OutputCadence::try_from(0).is_err());
    }

    fn primary_10s_30fps() -> VideoAsset {
        VideoAsset {
            path: PathBuf::from("a.mp4"),
            width: 1920,
            height: 1080,
            fps: 30.0,
            duration: 10.0,
            frame_count: 300,
        }
    }

    #[test]
    fn test_total_output_frames_floor() {
        let mut primary = primary_10s_30fps();
        primary.duration = 10.37;
        let plan = MixPlan::for_primary(OutputCadence::Fps60, &primary);
        assert_eq!(plan.total_output_frames, 622); // floor(10.37 * 60)
    }

    #[test]
    fn test_plan_scenario_10s_30fps_at_60() {
        // 300 primary frames into a 600-slot output: half and half.
        let plan = MixPlan::for_primary(OutputCadence::Fps60, &primary_10s_30fps());
        assert_eq!(plan.total_output_frames, 600);
        assert_eq!(plan.primary_frame_count(), 300);
        assert_eq!(&plan.primary_positions[..6], &[0, 1, 2, 4, 6, 8]);

        let sources: Vec<SlotSource> = plan.cursor().collect();
        assert_eq!(sources.len(), 600);
        let primary_slots: Vec<u64> = sources
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == SlotSource::Primary)
            .map(|(i, _)| i as u64)
            .collect();
        assert_eq!(primary_slots.len(), 300);
        assert_eq!(primary_slots, plan.primary_positions);
    }

    #[test]
    fn test_cursor_positions_beyond_total_never_yielded() {
        // 240fps spreads 300 frames far past a short output window.
        let mut primary = primary_10s_30fps();
        primary.duration = 1.0;
        let plan = MixPlan::for_primary(OutputCadence::Fps240, &primary);
        assert_eq!(plan.total_output_frames, 240);
        let primary_slots = plan
            .cursor()
            .filter(|s| *s == SlotSource::Primary)
            .count() as u64;
        assert!(primary_slots < plan.primary_frame_count());
    }
}

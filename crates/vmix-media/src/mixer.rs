//! Frame stream mixer.
//!
//! Drives two raw decode pipes and one raw encode pipe from a single
//! task: for every output slot the plan decides whether the next
//! primary or the next cover frame is pushed to the encoder. The
//! awaited write per frame is the only flow control; the OS pipe
//! buffers bound how far decode can run ahead of encode.

use std::path::Path;
use tracing::{debug, info, warn};

use vmix_models::{MixPlan, SlotSource, VideoAsset};

use crate::error::MediaResult;
use crate::frames::{CyclicFrameSource, RawFrameSink, RawFrameSource};

/// Log a progress line every this many frames.
const PROGRESS_INTERVAL: u64 = 50;

/// Result of a mixing run.
#[derive(Debug, Clone, Copy)]
pub struct MixOutcome {
    /// Frames actually pushed to the encoder
    pub frames_written: u64,
    /// Whether the primary ran out before the planned output length
    pub truncated: bool,
}

/// Stream `plan.total_output_frames` frames into `sink`.
///
/// The primary stream is finite; the cover stream cycles forever. If
/// the primary ends before all its planned slots were filled, mixing
/// stops early: the emitted count falls short of the plan, which is a
/// warning condition rather than a failure.
pub async fn mix_streams(
    primary: &VideoAsset,
    cover_path: &Path,
    plan: &MixPlan,
    sink: &mut RawFrameSink,
) -> MediaResult<MixOutcome> {
    let mut primary_source = RawFrameSource::open(&primary.path, primary.width, primary.height)?;
    let mut cover_source = CyclicFrameSource::open(cover_path, primary.width, primary.height)?;

    let expected_primary = plan.primary_frame_count();
    let total = plan.total_output_frames;
    let mut primary_emitted: u64 = 0;
    let mut truncated = false;

    info!(
        "Mixing {} slots ({} primary, cover fraction {:.1}%)",
        total,
        expected_primary,
        plan.cadence.cover_fraction() * 100.0
    );

    for (slot, source) in plan.cursor().enumerate() {
        let take_primary = source == SlotSource::Primary && primary_emitted < expected_primary;

        if take_primary {
            match primary_source.next_frame().await? {
                Some(frame) => {
                    sink.write_frame(frame).await?;
                    primary_emitted += 1;
                }
                None => {
                    // Fewer decodable frames than the probe promised.
                    warn!(
                        "primary stream ended early at slot {} ({} of {} frames emitted)",
                        slot, primary_emitted, expected_primary
                    );
                    truncated = true;
                    break;
                }
            }
        } else {
            let frame = cover_source.next_frame().await?;
            sink.write_frame(frame).await?;
        }

        let written = sink.frames_written();
        if written % PROGRESS_INTERVAL == 0 || written == total {
            debug!("mixed {} / {} frames", written, total);
        }
    }

    let frames_written = sink.frames_written();
    if frames_written < total && !truncated {
        truncated = true;
    }
    info!(
        "Mixing done: {} / {} frames written (truncated: {})",
        frames_written, total, truncated
    );

    Ok(MixOutcome {
        frames_written,
        truncated,
    })
}

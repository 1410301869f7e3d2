//! Video encoding profiles and constants.

use serde::{Deserialize, Serialize};

/// Software video encoder
pub const SOFTWARE_ENCODER: &str = "libx264";
/// Hardware (NVENC) video encoder
pub const HARDWARE_ENCODER: &str = "h264_nvenc";
/// NVENC preset used across all passes
pub const HARDWARE_PRESET: &str = "p6";
/// Audio codec
pub const AUDIO_CODEC: &str = "aac";
/// Audio bitrate
pub const AUDIO_BITRATE: &str = "128k";

/// CRF/CQ for the visually lossless cover resize copy
pub const RESIZE_QUALITY: u8 = 18;
/// CRF used by software encodes of the mixed stream
pub const MIX_CRF: u8 = 20;
/// CRF used by the software size-guard pass
pub const SIZE_GUARD_CRF: u8 = 22;

/// Output files larger than this trigger the size-guard second pass.
pub const SIZE_GUARD_LIMIT_BYTES: u64 = 49 * 1024 * 1024;

/// Bitrate ladder boundaries (primary duration, seconds).
pub const SHORT_CLIP_MAX_SECS: f64 = 20.0;
pub const MEDIUM_CLIP_MAX_SECS: f64 = 35.0;

/// Target/max/buffer bitrates for one encoding pass.
///
/// Selected once per run from the duration-tiered ladder and immutable
/// afterwards. Values are FFmpeg bitrate strings (e.g. `"8000k"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingProfile {
    /// Target bitrate (`-b:v`)
    pub bitrate: String,
    /// Peak bitrate (`-maxrate`)
    pub max_bitrate: String,
    /// Rate-control buffer (`-bufsize`)
    pub buffer_size: String,
}

impl EncodingProfile {
    fn new(bitrate: &str, max_bitrate: &str, buffer_size: &str) -> Self {
        Self {
            bitrate: bitrate.to_string(),
            max_bitrate: max_bitrate.to_string(),
            buffer_size: buffer_size.to_string(),
        }
    }

    /// Select a profile from the duration-tiered ladder.
    ///
    /// Tiers are keyed on the primary video's duration, not the mixed
    /// output's: <=20s -> 8M, 20-35s -> 6M, >35s -> 4.5M.
    pub fn for_duration(primary_duration_secs: f64) -> Self {
        if primary_duration_secs <= SHORT_CLIP_MAX_SECS {
            Self::new("8000k", "9000k", "18000k")
        } else if primary_duration_secs <= MEDIUM_CLIP_MAX_SECS {
            Self::new("6000k", "7000k", "14000k")
        } else {
            Self::new("4500k", "5500k", "11000k")
        }
    }

    /// Fixed low profile for the size-guard second pass.
    pub fn size_guard() -> Self {
        Self::new("3800k", "4200k", "8400k")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_tiers() {
        assert_eq!(EncodingProfile::for_duration(5.0).bitrate, "8000k");
        assert_eq!(EncodingProfile::for_duration(20.0).bitrate, "8000k");
        assert_eq!(EncodingProfile::for_duration(20.1).bitrate, "6000k");
        assert_eq!(EncodingProfile::for_duration(35.0).bitrate, "6000k");
        assert_eq!(EncodingProfile::for_duration(35.1).bitrate, "4500k");
        assert_eq!(EncodingProfile::for_duration(600.0).bitrate, "4500k");
    }

    #[test]
    fn test_ladder_buffer_doubles_target_cap_headroom() {
        let p = EncodingProfile::for_duration(10.0);
        assert_eq!(p.max_bitrate, "9000k");
        assert_eq!(p.buffer_size, "18000k");
    }

    #[test]
    fn test_size_guard_profile() {
        let p = EncodingProfile::size_guard();
        assert_eq!(p.bitrate, "3800k");
        assert_eq!(p.max_bitrate, "4200k");
        assert_eq!(p.buffer_size, "8400k");
    }
}

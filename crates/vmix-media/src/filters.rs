//! FFmpeg filter-graph fragments.

use rand::Rng;

/// Aspect-preserving scale followed by centered black padding.
///
/// Never crops: content smaller than the target in one dimension gets
/// black bars, exactly matching the cover-resize contract.
pub fn scale_pad_filter(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black",
        w = width,
        h = height
    )
}

/// Fade-in applied by the fallback transcode.
pub const FALLBACK_FADE: &str = "fade=t=in:st=0:d=0.5";

/// Translucent border overlay for the fallback transcode.
pub const FALLBACK_BORDER: &str = "drawbox=x=0:y=0:w=iw:h=ih:color=black@0.12:t=2";

/// Near-invisible slow-moving corner box for the fallback transcode.
pub const FALLBACK_CORNER: &str =
    "drawbox=x=W-w-20-10*sin(t*0.5):y=20+8*cos(t*0.7):w=120:h=36:color=white@0.05:t=fill";

/// Light, randomized perturbation parameters for the fallback transcode.
#[derive(Debug, Clone, Copy)]
pub struct FallbackJitter {
    /// Fraction cropped from each edge before scaling (0.01..0.02)
    pub crop_ratio: f64,
    /// Overall playback speed factor (0.97..1.03)
    pub speed: f64,
    /// Brightness offset (-0.02..0.02)
    pub brightness: f64,
    /// Contrast factor (0.98..1.03)
    pub contrast: f64,
    /// Saturation factor (0.98..1.03)
    pub saturation: f64,
    /// Audio pitch factor, 2^(semitones/12) for semitones in -1..1
    pub pitch_factor: f64,
}

impl FallbackJitter {
    /// Sample a fresh set of perturbations.
    pub fn sample(rng: &mut impl Rng) -> Self {
        let semitone: f64 = rng.random_range(-1.0..1.0);
        Self {
            crop_ratio: rng.random_range(0.01..0.02),
            speed: rng.random_range(0.97..1.03),
            brightness: rng.random_range(-0.02..0.02),
            contrast: rng.random_range(0.98..1.03),
            saturation: rng.random_range(0.98..1.03),
            pitch_factor: 2f64.powf(semitone / 12.0),
        }
    }

    /// No perturbation at all; used by tests.
    pub fn neutral() -> Self {
        Self {
            crop_ratio: 0.0,
            speed: 1.0,
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            pitch_factor: 1.0,
        }
    }
}

/// Build the complete fallback filter graph.
///
/// Video chain: edge crop, scale+pad to target geometry, color jitter,
/// faint noise, fade-in, border, moving corner box, speed change,
/// yuv420p. Audio chain: pitch shift via resample, tempo matched to
/// the video speed. Outputs are labeled `[vout]` and `[aout]`.
pub fn build_fallback_filter(jitter: &FallbackJitter, width: u32, height: u32) -> String {
    let mut v_filters: Vec<String> = Vec::new();

    if jitter.crop_ratio > 0.0 {
        v_filters.push(format!(
            "crop=w=iw*(1-{r:.4}):h=ih*(1-{r:.4}):x=iw*{half:.4}:y=ih*{half:.4}",
            r = jitter.crop_ratio,
            half = jitter.crop_ratio / 2.0
        ));
    }
    v_filters.push(scale_pad_filter(width, height));
    if jitter.brightness != 0.0 || jitter.contrast != 1.0 || jitter.saturation != 1.0 {
        v_filters.push(format!(
            "eq=brightness={:.4}:contrast={:.4}:saturation={:.4}",
            jitter.brightness, jitter.contrast, jitter.saturation
        ));
        v_filters.push("noise=alls=2:allf=t".to_string());
    }
    v_filters.push(FALLBACK_FADE.to_string());
    v_filters.push(FALLBACK_BORDER.to_string());
    v_filters.push(FALLBACK_CORNER.to_string());
    if (jitter.speed - 1.0).abs() > 1e-3 {
        v_filters.push(format!("setpts=PTS/{:.5}", jitter.speed));
    }
    v_filters.push("format=yuv420p".to_string());

    let mut a_filters: Vec<String> = Vec::new();
    if (jitter.pitch_factor - 1.0).abs() > 1e-3 {
        // Pitch shift that keeps duration: resample up, then back down.
        a_filters.push("aresample=async=1:min_comp=0.001:first_pts=0".to_string());
        a_filters.push(format!("asetrate=44100*{:.6}", jitter.pitch_factor));
        a_filters.push("aresample=44100".to_string());
    }
    if (jitter.speed - 1.0).abs() > 1e-3 {
        // atempo only supports 0.5..2.0
        a_filters.push(format!("atempo={:.5}", jitter.speed.clamp(0.5, 2.0)));
    }

    let a_chain = if a_filters.is_empty() {
        "anull".to_string()
    } else {
        a_filters.join(",")
    };

    format!("[0:v]{}[vout];[0:a]{}[aout]", v_filters.join(","), a_chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_pad_filter_never_crops() {
        let filter = scale_pad_filter(1920, 1080);
        assert!(filter.contains("force_original_aspect_ratio=decrease"));
        assert!(filter.contains("pad=1920:1080"));
        assert!(!filter.contains("crop"));
    }

    #[test]
    fn test_fallback_filter_neutral() {
        let filter = build_fallback_filter(&FallbackJitter::neutral(), 1080, 1920);
        assert!(filter.starts_with("[0:v]"));
        assert!(filter.ends_with("[aout]"));
        assert!(filter.contains("[0:a]anull[aout]"));
        assert!(filter.contains("fade=t=in"));
        assert!(filter.contains("drawbox"));
        // Neutral jitter adds no crop, speed or eq stages.
        assert!(!filter.contains("setpts"));
        assert!(!filter.contains("eq="));
        assert!(!filter.contains("atempo"));
    }

    #[test]
    fn test_fallback_filter_jittered() {
        let jitter = FallbackJitter {
            crop_ratio: 0.015,
            speed: 1.02,
            brightness: 0.01,
            contrast: 1.01,
            saturation: 0.99,
            pitch_factor: 1.03,
        };
        let filter = build_fallback_filter(&jitter, 1080, 1920);
        assert!(filter.contains("crop=w=iw*(1-0.0150)"));
        assert!(filter.contains("setpts=PTS/1.02000"));
        assert!(filter.contains("eq=brightness=0.0100"));
        assert!(filter.contains("asetrate=44100*1.030000"));
        assert!(filter.contains("atempo=1.02000"));
    }

    #[test]
    fn test_sampled_jitter_in_range() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let j = FallbackJitter::sample(&mut rng);
            assert!(j.crop_ratio >= 0.01 && j.crop_ratio < 0.02);
            assert!(j.speed >= 0.97 && j.speed < 1.03);
            assert!(j.pitch_factor > 0.9 && j.pitch_factor < 1.1);
        }
    }
}

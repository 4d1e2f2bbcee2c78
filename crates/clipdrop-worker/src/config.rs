//! Run configuration.

use std::str::FromStr;
use std::time::Duration;

use clipdrop_media::encoders::DEFAULT_VAAPI_DEVICE;

/// Tuning knobs for the size-fit run.
///
/// The bitrate constants are tuning values, not exact science: the
/// safety factor absorbs encoder variance and container overhead, the
/// audio reserve matches the fixed AAC track, and the floors keep the
/// ladder from attempting encodes that would look terrible anyway.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Fraction of the byte budget actually planned for
    pub safety_factor: f64,
    /// Audio allowance baked into the bitrate formula, kbit/s
    pub audio_reserve_kbps: u32,
    /// Absolute video bitrate floor, kbit/s
    pub min_video_bitrate_kbps: u32,
    /// Visually-acceptable floor at 1080p-class area, kbit/s; scaled
    /// down by pixel area for smaller tiers
    pub tier_floor_kbps: u32,
    /// Acceptable overshoot fraction over the byte ceiling
    pub size_tolerance: f64,
    /// Kill an attempt when FFmpeg reports no progress for this long
    pub stall_timeout: Duration,
    /// Plan with the software encoder only, regardless of the probe
    pub force_software: bool,
    /// Render node for VA-API uploads
    pub vaapi_device: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            safety_factor: 0.90,
            audio_reserve_kbps: 128,
            min_video_bitrate_kbps: 250,
            tier_floor_kbps: 500,
            size_tolerance: 0.0,
            stall_timeout: Duration::from_secs(30),
            force_software: false,
            vaapi_device: DEFAULT_VAAPI_DEVICE.to_string(),
        }
    }
}

impl RunConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            safety_factor: env_parse("CLIPDROP_SAFETY_FACTOR", defaults.safety_factor),
            audio_reserve_kbps: env_parse("CLIPDROP_AUDIO_RESERVE_KBPS", defaults.audio_reserve_kbps),
            min_video_bitrate_kbps: env_parse(
                "CLIPDROP_MIN_BITRATE_KBPS",
                defaults.min_video_bitrate_kbps,
            ),
            tier_floor_kbps: env_parse("CLIPDROP_TIER_FLOOR_KBPS", defaults.tier_floor_kbps),
            size_tolerance: env_parse("CLIPDROP_SIZE_TOLERANCE", defaults.size_tolerance),
            stall_timeout: Duration::from_secs(env_parse(
                "CLIPDROP_STALL_TIMEOUT_SECS",
                defaults.stall_timeout.as_secs(),
            )),
            force_software: std::env::var("CLIPDROP_FORCE_SOFTWARE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            vaapi_device: std::env::var("CLIPDROP_VAAPI_DEVICE")
                .unwrap_or(defaults.vaapi_device),
        }
    }
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert!((config.safety_factor - 0.90).abs() < 1e-9);
        assert_eq!(config.audio_reserve_kbps, 128);
        assert_eq!(config.min_video_bitrate_kbps, 250);
        assert_eq!(config.stall_timeout, Duration::from_secs(30));
        assert!(!config.force_software);
    }
}

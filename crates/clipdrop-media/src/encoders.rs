//! Per-backend FFmpeg argument strategies.
//!
//! Each [`EncoderBackend`] maps to a fixed way of wiring up the FFmpeg
//! command line: hardware upload arguments, the scaling filter chain,
//! and rate-control flags. VA-API is the odd one out since frames must
//! be uploaded to the GPU and scaled there.

use clipdrop_models::EncoderBackend;

/// Render node used for VA-API uploads when none is configured.
pub const DEFAULT_VAAPI_DEVICE: &str = "/dev/dri/renderD128";

/// Input-side arguments (placed before `-i`) for a backend.
pub fn input_args(backend: EncoderBackend, vaapi_device: &str) -> Vec<String> {
    match backend {
        EncoderBackend::Vaapi => vec![
            "-hwaccel".to_string(),
            "vaapi".to_string(),
            "-hwaccel_device".to_string(),
            vaapi_device.to_string(),
            "-hwaccel_output_format".to_string(),
            "vaapi".to_string(),
        ],
        _ => Vec::new(),
    }
}

/// Video-filter chain for an optional scale target.
///
/// VA-API always needs the `format=nv12,hwupload` pipeline even when no
/// scaling happens; other backends only get a filter when downscaling.
pub fn scale_filter(backend: EncoderBackend, target: Option<(u32, u32)>) -> Option<String> {
    match backend {
        EncoderBackend::Vaapi => {
            let mut parts = vec!["format=nv12".to_string(), "hwupload".to_string()];
            if let Some((w, h)) = target {
                parts.push(format!("scale_vaapi=w={w}:h={h}:format=nv12"));
            }
            Some(parts.join(","))
        }
        _ => target.map(|(w, h)| format!("scale={w}:{h}")),
    }
}

/// Rate-control and quality arguments at the given video bitrate.
///
/// Hardware encoders overshoot a plain `-b:v` target badly; capping with
/// `-maxrate`/`-bufsize` keeps output sizes close to the plan.
pub fn rate_control_args(backend: EncoderBackend, bitrate_bps: u64) -> Vec<String> {
    let kbps = (bitrate_bps / 1000).max(1);

    let mut args = vec![
        "-b:v".to_string(),
        format!("{kbps}k"),
        "-maxrate".to_string(),
        format!("{kbps}k"),
        "-bufsize".to_string(),
        format!("{}k", kbps * 2),
    ];

    match backend {
        EncoderBackend::Amf => {
            args.push("-quality".to_string());
            args.push("balanced".to_string());
        }
        EncoderBackend::Nvenc | EncoderBackend::Qsv | EncoderBackend::Software => {
            args.push("-preset".to_string());
            args.push("medium".to_string());
        }
        EncoderBackend::Vaapi => {}
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vaapi_input_pipeline() {
        let args = input_args(EncoderBackend::Vaapi, DEFAULT_VAAPI_DEVICE);
        assert_eq!(args[0], "-hwaccel");
        assert!(args.contains(&"/dev/dri/renderD128".to_string()));

        assert!(input_args(EncoderBackend::Nvenc, DEFAULT_VAAPI_DEVICE).is_empty());
        assert!(input_args(EncoderBackend::Software, DEFAULT_VAAPI_DEVICE).is_empty());
    }

    #[test]
    fn test_vaapi_filter_chain() {
        let filter = scale_filter(EncoderBackend::Vaapi, Some((1280, 720))).unwrap();
        assert_eq!(
            filter,
            "format=nv12,hwupload,scale_vaapi=w=1280:h=720:format=nv12"
        );

        // Upload pipeline stays even without scaling
        let filter = scale_filter(EncoderBackend::Vaapi, None).unwrap();
        assert_eq!(filter, "format=nv12,hwupload");
    }

    #[test]
    fn test_plain_scale_filter() {
        assert_eq!(
            scale_filter(EncoderBackend::Nvenc, Some((854, 480))).unwrap(),
            "scale=854:480"
        );
        assert!(scale_filter(EncoderBackend::Software, None).is_none());
    }

    #[test]
    fn test_rate_control_per_backend() {
        let nvenc = rate_control_args(EncoderBackend::Nvenc, 1_260_000);
        assert!(nvenc.contains(&"-b:v".to_string()));
        assert!(nvenc.contains(&"1260k".to_string()));
        assert!(nvenc.contains(&"2520k".to_string()));
        assert!(nvenc.contains(&"medium".to_string()));

        let amf = rate_control_args(EncoderBackend::Amf, 1_000_000);
        assert!(amf.contains(&"-quality".to_string()));
        assert!(amf.contains(&"balanced".to_string()));
        assert!(!amf.contains(&"-preset".to_string()));

        let vaapi = rate_control_args(EncoderBackend::Vaapi, 1_000_000);
        assert!(!vaapi.contains(&"-preset".to_string()));
    }

    #[test]
    fn test_tiny_bitrate_never_zero() {
        let args = rate_control_args(EncoderBackend::Software, 500);
        assert!(args.contains(&"1k".to_string()));
    }
}

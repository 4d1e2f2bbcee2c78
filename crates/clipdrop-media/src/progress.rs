//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress information parsed from FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Progress percentage given the clip duration in milliseconds.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).min(100.0)
    }
}

/// Parse one line of FFmpeg `-progress` key/value output.
///
/// Accumulates fields into `current` and returns a snapshot whenever a
/// `progress=` line closes a block.
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let line = line.trim();

    if let Some((key, value)) = line.split_once('=') {
        match key {
            "out_time_ms" | "out_time_us" => {
                // Both keys carry microseconds in modern FFmpeg builds;
                // out_time_ms is a historical misnomer.
                if let Ok(us) = value.parse::<i64>() {
                    current.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    current.frame = frame;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse() {
                    current.fps = fps;
                }
            }
            "speed" => {
                if value != "N/A" {
                    if let Some(speed_str) = value.strip_suffix('x') {
                        if let Ok(speed) = speed_str.parse() {
                            current.speed = speed;
                        }
                    }
                }
            }
            "progress" => {
                if value == "end" {
                    current.is_complete = true;
                }
                return Some(current.clone());
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        let progress = FfmpegProgress {
            out_time_ms: 5000,
            ..Default::default()
        };

        assert!((progress.percentage(10000) - 50.0).abs() < 0.01);
        assert!((progress.percentage(5000) - 100.0).abs() < 0.01);
        // Overshoot past the clip duration is clamped
        assert!((progress.percentage(2500) - 100.0).abs() < 0.01);
        assert!((progress.percentage(0) - 0.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_progress_block() {
        let mut progress = FfmpegProgress::default();

        assert!(parse_progress_line("frame=120", &mut progress).is_none());
        assert!(parse_progress_line("out_time_us=5000000", &mut progress).is_none());
        assert!(parse_progress_line("speed=1.5x", &mut progress).is_none());

        let snapshot = parse_progress_line("progress=continue", &mut progress).unwrap();
        assert_eq!(snapshot.frame, 120);
        assert_eq!(snapshot.out_time_ms, 5000);
        assert!((snapshot.speed - 1.5).abs() < 0.01);
        assert!(!snapshot.is_complete);

        let done = parse_progress_line("progress=end", &mut progress).unwrap();
        assert!(done.is_complete);
    }

    #[test]
    fn test_parse_ignores_noise() {
        let mut progress = FfmpegProgress::default();
        assert!(parse_progress_line("speed=N/A", &mut progress).is_none());
        assert!(parse_progress_line("random stderr chatter", &mut progress).is_none());
        assert!((progress.speed - 0.0).abs() < f64::EPSILON);
    }
}

//! Clip selection within a source recording.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Validation errors for a clip selection.
///
/// These are fatal: a run rejects an invalid selection before any
/// encode attempt is made.
#[derive(Debug, Error)]
pub enum InvalidClip {
    #[error("clip start {0:.3}s is negative")]
    NegativeStart(f64),

    #[error("clip start {start:.3}s must be before end {end:.3}s")]
    EmptyRange { start: f64, end: f64 },

    #[error("clip end {end:.3}s is past the source duration {duration:.3}s")]
    PastEnd { end: f64, duration: f64 },
}

/// A user-selected in/out range within a source recording, together with
/// the source metrics the planner needs.
///
/// Immutable once an encode run begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSpec {
    /// Source recording on disk
    pub source: PathBuf,

    /// Range start, seconds from the start of the source
    pub start_secs: f64,

    /// Range end, seconds from the start of the source
    pub end_secs: f64,

    /// Full source duration in seconds, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_duration: Option<f64>,

    /// Source frame width in pixels
    pub width: u32,

    /// Source frame height in pixels
    pub height: u32,

    /// Source frame rate
    pub fps: f64,

    /// Source bitrate in bits/second (0 when unknown)
    #[serde(default)]
    pub bitrate: u64,
}

impl ClipSpec {
    /// Selected clip duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Source pixel area, used for tier ordering.
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Validate the selected range against the source.
    pub fn validate(&self) -> Result<(), InvalidClip> {
        if self.start_secs < 0.0 {
            return Err(InvalidClip::NegativeStart(self.start_secs));
        }
        if self.end_secs <= self.start_secs {
            return Err(InvalidClip::EmptyRange {
                start: self.start_secs,
                end: self.end_secs,
            });
        }
        if let Some(duration) = self.source_duration {
            // Allow a millisecond of slack for float timestamps from probing.
            if self.end_secs > duration + 0.001 {
                return Err(InvalidClip::PastEnd {
                    end: self.end_secs,
                    duration,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(start: f64, end: f64, source_duration: Option<f64>) -> ClipSpec {
        ClipSpec {
            source: PathBuf::from("/tmp/recording.mp4"),
            start_secs: start,
            end_secs: end,
            source_duration,
            width: 1920,
            height: 1080,
            fps: 60.0,
            bitrate: 20_000_000,
        }
    }

    #[test]
    fn test_valid_range() {
        assert!(spec(10.0, 20.0, Some(120.0)).validate().is_ok());
        assert!(spec(0.0, 0.5, None).validate().is_ok());
    }

    #[test]
    fn test_empty_range_rejected() {
        assert!(matches!(
            spec(20.0, 20.0, None).validate(),
            Err(InvalidClip::EmptyRange { .. })
        ));
        assert!(matches!(
            spec(20.0, 10.0, None).validate(),
            Err(InvalidClip::EmptyRange { .. })
        ));
    }

    #[test]
    fn test_negative_start_rejected() {
        assert!(matches!(
            spec(-1.0, 10.0, None).validate(),
            Err(InvalidClip::NegativeStart(_))
        ));
    }

    #[test]
    fn test_end_past_source_rejected() {
        assert!(matches!(
            spec(10.0, 121.0, Some(120.0)).validate(),
            Err(InvalidClip::PastEnd { .. })
        ));
        // Probe rounding slack: 120.0005 vs 120.0 is fine
        assert!(spec(10.0, 120.0005, Some(120.0)).validate().is_ok());
    }

    #[test]
    fn test_duration() {
        assert!((spec(10.5, 20.75, None).duration() - 10.25).abs() < 1e-9);
    }
}

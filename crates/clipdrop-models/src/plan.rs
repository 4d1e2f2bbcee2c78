//! Encode plan: resolution tiers and ladder steps.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::encoder::EncoderCandidate;

/// Default descending tier table for progressive compression.
pub const DEFAULT_TIERS: [(u32, u32, &str); 4] = [
    (1920, 1080, "1080p"),
    (1280, 720, "720p"),
    (854, 480, "480p"),
    (640, 360, "360p"),
];

/// A named output resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionTier {
    pub width: u32,
    pub height: u32,
    pub label: String,
}

impl ResolutionTier {
    pub fn new(width: u32, height: u32, label: impl Into<String>) -> Self {
        Self {
            width,
            height,
            label: label.into(),
        }
    }

    /// Tier matching the source resolution (no scaling applied).
    pub fn source(width: u32, height: u32) -> Self {
        Self::new(width, height, "source")
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{})", self.label, self.width, self.height)
    }
}

/// How the ladder is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlanMode {
    /// Fit the clip under the size budget, stepping down tiers as needed.
    SizeFit,
    /// Single encode at the user's chosen bitrate; the user owns the
    /// quality/size tradeoff and no stepping down occurs.
    Custom { bitrate_bps: u64 },
}

impl PlanMode {
    pub fn is_size_fit(&self) -> bool {
        matches!(self, PlanMode::SizeFit)
    }
}

/// One rung of the encode ladder: a target resolution, a computed
/// bitrate, and the encoder candidate to drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodePlanStep {
    pub tier: ResolutionTier,
    pub bitrate_bps: u64,
    pub candidate: EncoderCandidate,
    /// True when the tier matches the source resolution exactly,
    /// in which case no scaling filter is applied.
    pub is_source_resolution: bool,
}

impl EncodePlanStep {
    pub fn describe(&self) -> String {
        format!(
            "{} @ {}kbps via {}",
            self.tier,
            self.bitrate_bps / 1000,
            self.candidate.backend
        )
    }
}

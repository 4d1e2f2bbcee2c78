//! Output size budget.

use serde::{Deserialize, Serialize};

/// Discord's upload ceiling for accounts without a boosted server.
pub const DISCORD_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Byte ceiling a finished clip must fit under.
///
/// An encode at or under the ceiling (plus tolerance) is acceptable;
/// overshoot triggers another ladder attempt, not acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeBudget {
    /// Target byte ceiling
    pub target_bytes: u64,

    /// Fraction of overshoot still accepted (0.02 = 2%)
    #[serde(default)]
    pub tolerance: f64,
}

impl SizeBudget {
    pub fn new(target_bytes: u64, tolerance: f64) -> Self {
        Self {
            target_bytes,
            tolerance: tolerance.max(0.0),
        }
    }

    /// Budget matching Discord's upload limit.
    pub fn for_discord() -> Self {
        Self::new(DISCORD_MAX_UPLOAD_BYTES, 0.0)
    }

    /// Largest byte size this budget accepts.
    pub fn max_acceptable_bytes(&self) -> u64 {
        (self.target_bytes as f64 * (1.0 + self.tolerance)) as u64
    }

    /// Whether an output of `bytes` fits the budget.
    pub fn accepts(&self, bytes: u64) -> bool {
        bytes > 0 && bytes <= self.max_acceptable_bytes()
    }

    /// Clamp the target to the source file size.
    ///
    /// Re-encoding toward a budget larger than the source cannot make the
    /// clip bigger than the source already is, so the effective target is
    /// the smaller of the two.
    pub fn clamped_to(&self, source_bytes: u64) -> Self {
        if source_bytes > 0 && self.target_bytes > source_bytes {
            Self {
                target_bytes: source_bytes,
                tolerance: self.tolerance,
            }
        } else {
            *self
        }
    }
}

//! Progress reporting types.

use serde::{Deserialize, Serialize};

/// Coarse phase of a run, reported alongside the percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Validating inputs and building the ladder
    Preparing,
    /// An encode attempt is in flight
    Encoding,
    /// Uploading the accepted clip to webhooks
    Delivering,
    /// Terminal state reached
    Complete,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Preparing => "preparing",
            RunPhase::Encoding => "encoding",
            RunPhase::Delivering => "delivering",
            RunPhase::Complete => "complete",
        }
    }
}

/// A progress update pushed to the UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Overall percent, 0-100
    pub percent: u8,
    pub phase: RunPhase,
}

impl ProgressUpdate {
    pub fn new(percent: u8, phase: RunPhase) -> Self {
        Self {
            percent: percent.min(100),
            phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_clamped() {
        assert_eq!(ProgressUpdate::new(250, RunPhase::Encoding).percent, 100);
        assert_eq!(ProgressUpdate::new(42, RunPhase::Encoding).percent, 42);
    }
}

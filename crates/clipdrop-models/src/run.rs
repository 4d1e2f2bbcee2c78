//! Run state, attempt history and terminal outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::encoder::EncoderBackend;
use crate::plan::EncodePlanStep;
use crate::webhook::TargetOutcome;

/// Unique identifier for a size-fit run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a single encode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Output produced and fits the budget
    Success,
    /// The encoder process failed or produced no output
    EncoderFailed,
    /// Output produced but over budget
    SizeExceeded,
    /// Cancellation observed mid-attempt
    Cancelled,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::EncoderFailed => "encoder_failed",
            AttemptOutcome::SizeExceeded => "size_exceeded",
            AttemptOutcome::Cancelled => "cancelled",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

/// Record of one executed ladder step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub step: EncodePlanStep,
    /// Run-scoped temporary output path for this attempt
    pub output: PathBuf,
    /// Resulting byte size (0 when no output was produced)
    pub output_bytes: u64,
    /// Wall-clock duration of the attempt in seconds
    pub elapsed_secs: f64,
    pub outcome: AttemptOutcome,
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunOutcome {
    /// An attempt fit the budget; the file was promoted to its final path
    Accepted { path: PathBuf, bytes: u64 },
    /// The ladder was exhausted without an acceptable result
    Failed { reason: String },
    /// The user cancelled the run
    Cancelled,
}

impl RunOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RunOutcome::Accepted { .. })
    }
}

/// Full mutable state of one size-fit run.
///
/// Owned exclusively by the controller for the run's lifetime and dropped
/// with it; encoder liveness does not survive into later runs.
#[derive(Debug, Default)]
pub struct RunState {
    attempts: Vec<AttemptResult>,
    dead_backends: HashSet<EncoderBackend>,
    outcome: Option<RunOutcome>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished attempt. An `EncoderFailed` outcome marks the
    /// backend dead for the remainder of the run.
    pub fn record(&mut self, attempt: AttemptResult) {
        if attempt.outcome == AttemptOutcome::EncoderFailed {
            self.dead_backends.insert(attempt.step.candidate.backend);
        }
        self.attempts.push(attempt);
    }

    /// Whether a backend is still worth trying in this run.
    pub fn is_live(&self, backend: EncoderBackend) -> bool {
        !self.dead_backends.contains(&backend)
    }

    /// Set the terminal outcome. The first terminal outcome wins.
    pub fn finish(&mut self, outcome: RunOutcome) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn attempts(&self) -> &[AttemptResult] {
        &self.attempts
    }

    pub fn into_attempts(self) -> Vec<AttemptResult> {
        self.attempts
    }
}

/// Final report handed back to the caller once a run reaches a
/// terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    pub attempts: Vec<AttemptResult>,
    /// Per-webhook delivery outcomes (empty when no delivery occurred)
    pub delivery: Vec<TargetOutcome>,
    pub finished_at: DateTime<Utc>,
}

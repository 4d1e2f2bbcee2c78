//! Shared data models for ClipDrop.
//!
//! This crate provides Serde-serializable types for:
//! - Clip selections and size budgets
//! - Encoder backends and capability candidates
//! - Encode plans (resolution/bitrate ladder)
//! - Run state, attempt history and terminal outcomes
//! - Webhook targets and delivery outcomes

pub mod budget;
pub mod clip;
pub mod encoder;
pub mod plan;
pub mod progress;
pub mod run;
pub mod webhook;

// Re-export common types
pub use budget::{SizeBudget, DISCORD_MAX_UPLOAD_BYTES};
pub use clip::{ClipSpec, InvalidClip};
pub use encoder::{EncoderBackend, EncoderCandidate};
pub use plan::{EncodePlanStep, PlanMode, ResolutionTier, DEFAULT_TIERS};
pub use progress::{ProgressUpdate, RunPhase};
pub use run::{AttemptOutcome, AttemptResult, RunId, RunOutcome, RunReport, RunState};
pub use webhook::{DeliveryOutcome, TargetOutcome, WebhookTarget};

//! Delivery error types.

use std::path::PathBuf;
use thiserror::Error;

pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Errors raised before any per-target delivery happens.
///
/// Per-target failures are not errors; they surface as
/// [`clipdrop_models::DeliveryOutcome`] values instead.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("clip file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid webhook list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

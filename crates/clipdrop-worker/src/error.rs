//! Worker error types.

use std::path::PathBuf;
use thiserror::Error;

pub type RunResult<T> = Result<T, RunError>;

/// Fatal errors that stop a run before (or outside) the attempt loop.
///
/// Per-attempt encoder and size failures are not errors: the controller
/// absorbs them, records them in the attempt history, and advances the
/// ladder. Only the terminal outcome reaches the caller.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid clip selection: {0}")]
    InvalidClip(#[from] clipdrop_models::InvalidClip),

    #[error("source file unreadable: {path}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output directory not writable: {path}")]
    OutputDirUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("media error: {0}")]
    Media(#[from] clipdrop_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

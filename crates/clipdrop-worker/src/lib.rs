//! Size-fit transcode worker.
//!
//! Orchestrates one clip run end to end: builds the resolution/bitrate
//! ladder, drives encode attempts through the executor, decides when a
//! result fits the size budget, and hands the accepted file to the
//! webhook dispatcher. The controller runs on a worker task and talks to
//! the caller over a single event channel.

pub mod capabilities;
pub mod config;
pub mod controller;
pub mod error;
pub mod planner;
pub mod run;

pub use capabilities::{candidates_from_env, parse_candidates};
pub use config::RunConfig;
pub use controller::{
    AttemptRunner, FfmpegAttemptRunner, NullSink, ProgressSink, RunRequest, SizeFitController,
};
pub use error::{RunError, RunResult};
pub use planner::build_ladder;
pub use run::{spawn_run, Canceller, RunEvent, RunHandle};

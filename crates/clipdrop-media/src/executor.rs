//! Transcode executor: one FFmpeg process per ladder attempt.

use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

use clipdrop_models::{AttemptOutcome, AttemptResult, ClipSpec, EncodePlanStep, SizeBudget};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::encoders;
use crate::error::MediaError;

/// Drives one external FFmpeg process per plan step and classifies the
/// result.
///
/// The executor owns the process for the duration of the attempt: on
/// cancellation or a stall it kills the child and removes the partial
/// output. It writes exactly one output file per attempt and never
/// touches a prior attempt's file.
#[derive(Debug, Clone)]
pub struct TranscodeExecutor {
    /// Kill an attempt when FFmpeg reports no progress for this long
    pub stall_timeout: Duration,
    /// Render node for VA-API uploads
    pub vaapi_device: String,
    /// AAC bitrate for the audio track, in kbit/s
    pub audio_bitrate_kbps: u32,
}

impl Default for TranscodeExecutor {
    fn default() -> Self {
        Self {
            stall_timeout: Duration::from_secs(30),
            vaapi_device: encoders::DEFAULT_VAAPI_DEVICE.to_string(),
            audio_bitrate_kbps: 128,
        }
    }
}

impl TranscodeExecutor {
    pub fn new(stall_timeout: Duration) -> Self {
        Self {
            stall_timeout,
            ..Default::default()
        }
    }

    /// Run a single ladder step, writing `output`.
    ///
    /// `budget` of `None` skips the size check (custom-bitrate mode);
    /// otherwise an over-budget output is classified [`AttemptOutcome::SizeExceeded`]
    /// so the controller can advance the ladder.
    ///
    /// Progress is forwarded as a monotonically non-decreasing 0-100
    /// percent, clamping out-of-order reports from the tool.
    pub async fn run_step<F>(
        &self,
        clip: &ClipSpec,
        step: &EncodePlanStep,
        budget: Option<&SizeBudget>,
        output: &Path,
        cancel: watch::Receiver<bool>,
        mut on_percent: F,
    ) -> AttemptResult
    where
        F: FnMut(u8) + Send,
    {
        let backend = step.candidate.backend;
        let duration = clip.duration();
        let duration_ms = (duration * 1000.0) as i64;

        let scale_target = if step.is_source_resolution {
            None
        } else {
            Some((step.tier.width, step.tier.height))
        };

        let mut cmd = FfmpegCommand::new(&clip.source, output)
            .input_args(encoders::input_args(backend, &self.vaapi_device))
            .seek(clip.start_secs)
            .duration(duration)
            .video_codec(backend.codec_name())
            .output_args(encoders::rate_control_args(backend, step.bitrate_bps))
            .audio_codec("aac")
            .audio_bitrate(format!("{}k", self.audio_bitrate_kbps))
            .faststart();

        if let Some(filter) = encoders::scale_filter(backend, scale_target) {
            cmd = cmd.video_filter(filter);
        }

        let runner = FfmpegRunner::new()
            .with_cancel(cancel)
            .with_stall_timeout(self.stall_timeout);

        let started = Instant::now();
        let mut last_percent: u8 = 0;
        let result = runner
            .run_with_progress(&cmd, move |progress| {
                let percent = if progress.is_complete {
                    100
                } else {
                    progress.percentage(duration_ms) as u8
                };
                if percent > last_percent {
                    last_percent = percent;
                    on_percent(percent);
                }
            })
            .await;
        let elapsed_secs = started.elapsed().as_secs_f64();

        let outcome = match result {
            Ok(()) => match tokio::fs::metadata(output).await {
                Ok(meta) if meta.len() > 0 => {
                    let bytes = meta.len();
                    match budget {
                        Some(b) if !b.accepts(bytes) => {
                            info!(
                                step = %step.describe(),
                                bytes,
                                ceiling = b.max_acceptable_bytes(),
                                "attempt over budget"
                            );
                            return self.finished(step, output, bytes, elapsed_secs, AttemptOutcome::SizeExceeded);
                        }
                        _ => {
                            info!(step = %step.describe(), bytes, "attempt fits");
                            return self.finished(step, output, bytes, elapsed_secs, AttemptOutcome::Success);
                        }
                    }
                }
                _ => {
                    warn!(step = %step.describe(), "encoder exited cleanly but produced no output");
                    AttemptOutcome::EncoderFailed
                }
            },
            Err(MediaError::Cancelled) => AttemptOutcome::Cancelled,
            Err(MediaError::Stalled(secs)) => {
                warn!(step = %step.describe(), secs, "encoder stalled, treating as failed");
                AttemptOutcome::EncoderFailed
            }
            Err(e) => {
                warn!(step = %step.describe(), error = %e, "encoder failed");
                AttemptOutcome::EncoderFailed
            }
        };

        // Failed or cancelled attempts must not leave partial output behind.
        let _ = tokio::fs::remove_file(output).await;
        self.finished(step, output, 0, elapsed_secs, outcome)
    }

    fn finished(
        &self,
        step: &EncodePlanStep,
        output: &Path,
        output_bytes: u64,
        elapsed_secs: f64,
        outcome: AttemptOutcome,
    ) -> AttemptResult {
        AttemptResult {
            step: step.clone(),
            output: output.to_path_buf(),
            output_bytes,
            elapsed_secs,
            outcome,
        }
    }
}

//! Size-fit controller: drives the ladder until an attempt fits.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use clipdrop_delivery::WebhookDispatcher;
use clipdrop_media::{move_file, TranscodeExecutor};
use clipdrop_models::{
    AttemptOutcome, AttemptResult, ClipSpec, DeliveryOutcome, EncodePlanStep, EncoderCandidate,
    PlanMode, ProgressUpdate, RunId, RunOutcome, RunPhase, RunReport, RunState, SizeBudget,
    TargetOutcome, WebhookTarget,
};

use crate::config::RunConfig;
use crate::error::{RunError, RunResult};
use crate::planner::build_ladder;

/// Share of the progress range spent encoding; the rest covers delivery.
const ENCODE_PROGRESS_SHARE: f64 = 90.0;

const EXHAUSTED_REASON: &str = "no configuration met the size budget";

/// Sink for progress updates crossing to the UI collaborator.
pub trait ProgressSink: Send + Sync {
    fn update(&self, update: ProgressUpdate);
}

/// Sink that drops every update (tests, fire-and-forget runs).
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn update(&self, _update: ProgressUpdate) {}
}

/// Seam between the controller and the FFmpeg process layer.
#[async_trait]
pub trait AttemptRunner: Send + Sync {
    async fn run_step(
        &self,
        clip: &ClipSpec,
        step: &EncodePlanStep,
        budget: Option<&SizeBudget>,
        output: &Path,
        cancel: watch::Receiver<bool>,
        on_percent: Box<dyn FnMut(u8) + Send>,
    ) -> AttemptResult;
}

/// Production runner backed by the transcode executor.
pub struct FfmpegAttemptRunner {
    executor: TranscodeExecutor,
}

impl FfmpegAttemptRunner {
    pub fn new(executor: TranscodeExecutor) -> Self {
        Self { executor }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        let mut executor = TranscodeExecutor::new(config.stall_timeout);
        executor.vaapi_device = config.vaapi_device.clone();
        executor.audio_bitrate_kbps = config.audio_reserve_kbps;
        Self { executor }
    }
}

#[async_trait]
impl AttemptRunner for FfmpegAttemptRunner {
    async fn run_step(
        &self,
        clip: &ClipSpec,
        step: &EncodePlanStep,
        budget: Option<&SizeBudget>,
        output: &Path,
        cancel: watch::Receiver<bool>,
        on_percent: Box<dyn FnMut(u8) + Send>,
    ) -> AttemptResult {
        self.executor
            .run_step(clip, step, budget, output, cancel, on_percent)
            .await
    }
}

/// One clip request: what to encode, where it must land, and who gets it.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub clip: ClipSpec,
    pub budget: SizeBudget,
    pub mode: PlanMode,
    /// Probe-supplied encoder list, hardware before software
    pub candidates: Vec<EncoderCandidate>,
    /// Final resting place for the accepted clip
    pub output: PathBuf,
    /// Title attached to webhook uploads
    pub title: Option<String>,
    pub webhooks: Vec<WebhookTarget>,
}

/// Orchestrates one run: plan, attempt, advance, accept or give up,
/// then deliver.
///
/// Owns the [`RunState`] exclusively for the run's lifetime; attempt
/// files live in a run-scoped temp directory reclaimed on every
/// terminal outcome.
pub struct SizeFitController<R: AttemptRunner> {
    config: RunConfig,
    runner: R,
}

impl<R: AttemptRunner> SizeFitController<R> {
    pub fn new(config: RunConfig, runner: R) -> Self {
        Self { config, runner }
    }

    /// Execute a run to a terminal outcome.
    ///
    /// Steps run strictly sequentially: encoders compete for the same
    /// GPU, and advancing depends on the previous attempt's outcome.
    pub async fn run(
        &self,
        request: RunRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: watch::Receiver<bool>,
    ) -> RunResult<RunReport> {
        let run_id = RunId::new();
        info!(run_id = %run_id, source = %request.clip.source.display(), "starting clip run");
        sink.update(ProgressUpdate::new(0, RunPhase::Preparing));

        let source_bytes = self.check_inputs(&request).await?;

        let budget = if request.mode.is_size_fit() {
            request.budget.clamped_to(source_bytes)
        } else {
            request.budget
        };

        let ladder = build_ladder(
            &request.clip,
            &budget,
            request.mode,
            &request.candidates,
            &self.config,
        );

        let mut state = RunState::new();
        let mut accepted: Option<(PathBuf, u64)> = None;

        if ladder.is_empty() {
            // The builder guarantees a non-empty ladder; treat a violation
            // as a failed run rather than a panic.
            state.finish(RunOutcome::Failed {
                reason: "empty encode ladder".to_string(),
            });
        }

        let temp_dir = tempfile::Builder::new()
            .prefix("clipdrop-run-")
            .tempdir()?;

        let total_steps = ladder.len().max(1);
        let budget_for_attempts = request.mode.is_size_fit().then_some(&budget);

        for (idx, step) in ladder.iter().enumerate() {
            if state.is_terminal() {
                break;
            }
            if *cancel.borrow() {
                info!(run_id = %run_id, "cancellation observed before step");
                state.finish(RunOutcome::Cancelled);
                break;
            }
            if !state.is_live(step.candidate.backend) {
                debug!(step = %step.describe(), "backend already failed this run, skipping step");
                continue;
            }

            let output = temp_dir.path().join(format!(
                "attempt-{:02}-{}-{}.mp4",
                idx, step.tier.label, step.candidate.backend
            ));

            // Map this attempt's 0-100 into its slice of the encode window.
            let window_base = (idx as f64 / total_steps as f64) * ENCODE_PROGRESS_SHARE;
            let window = ENCODE_PROGRESS_SHARE / total_steps as f64;
            let attempt_sink = Arc::clone(&sink);
            let on_percent = Box::new(move |percent: u8| {
                let overall = window_base + (percent as f64 / 100.0) * window;
                attempt_sink.update(ProgressUpdate::new(overall as u8, RunPhase::Encoding));
            });

            info!(run_id = %run_id, step = %step.describe(), "starting encode attempt");
            let attempt = self
                .runner
                .run_step(
                    &request.clip,
                    step,
                    budget_for_attempts,
                    &output,
                    cancel.clone(),
                    on_percent,
                )
                .await;

            let outcome = attempt.outcome;
            let bytes = attempt.output_bytes;
            state.record(attempt);

            match outcome {
                AttemptOutcome::Success => {
                    accepted = Some((output, bytes));
                    break;
                }
                AttemptOutcome::Cancelled => {
                    state.finish(RunOutcome::Cancelled);
                }
                AttemptOutcome::EncoderFailed => {
                    warn!(
                        run_id = %run_id,
                        backend = %step.candidate.backend,
                        "encoder failed, advancing ladder"
                    );
                }
                AttemptOutcome::SizeExceeded => {
                    info!(run_id = %run_id, bytes, "attempt over budget, advancing ladder");
                }
            }
        }

        if !state.is_terminal() {
            match accepted {
                Some((path, bytes)) => {
                    move_file(&path, &request.output).await?;
                    info!(
                        run_id = %run_id,
                        output = %request.output.display(),
                        bytes,
                        "clip accepted"
                    );
                    state.finish(RunOutcome::Accepted {
                        path: request.output.clone(),
                        bytes,
                    });
                }
                None => {
                    state.finish(RunOutcome::Failed {
                        reason: EXHAUSTED_REASON.to_string(),
                    });
                }
            }
        }

        let delivery = match state.outcome() {
            Some(RunOutcome::Accepted { path, .. }) => {
                self.deliver(&run_id, path, &request, &sink).await
            }
            _ => Vec::new(),
        };

        // Every terminal state reclaims the run's temp files; the
        // accepted attempt was already moved out.
        if let Err(e) = temp_dir.close() {
            warn!(run_id = %run_id, "failed to clean run temp dir: {e}");
        }

        sink.update(ProgressUpdate::new(100, RunPhase::Complete));

        let outcome = state.outcome().cloned().unwrap_or(RunOutcome::Failed {
            reason: "run ended without a terminal outcome".to_string(),
        });
        info!(run_id = %run_id, ?outcome, "run finished");

        Ok(RunReport {
            run_id,
            outcome,
            attempts: state.into_attempts(),
            delivery,
            finished_at: Utc::now(),
        })
    }

    /// Fail-fast checks: valid range, readable source, writable
    /// destination. Returns the source file size.
    async fn check_inputs(&self, request: &RunRequest) -> RunResult<u64> {
        request.clip.validate()?;

        let meta = tokio::fs::metadata(&request.clip.source).await.map_err(|e| {
            RunError::SourceUnreadable {
                path: request.clip.source.clone(),
                source: e,
            }
        })?;

        if let Some(parent) = request.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    RunError::OutputDirUnwritable {
                        path: parent.to_path_buf(),
                        source: e,
                    }
                })?;
            }
        }

        Ok(meta.len())
    }

    /// Upload the accepted clip to each enabled webhook. Skipped
    /// entirely when nothing is enabled, leaving the file at rest.
    async fn deliver(
        &self,
        run_id: &RunId,
        path: &Path,
        request: &RunRequest,
        sink: &Arc<dyn ProgressSink>,
    ) -> Vec<TargetOutcome> {
        if !request.webhooks.iter().any(|t| t.enabled) {
            info!(run_id = %run_id, "no webhooks enabled, skipping delivery");
            return Vec::new();
        }

        sink.update(ProgressUpdate::new(95, RunPhase::Delivering));

        let result = match WebhookDispatcher::new() {
            Ok(dispatcher) => {
                dispatcher
                    .deliver(path, request.title.as_deref(), &request.webhooks)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(outcomes) => {
                for outcome in &outcomes {
                    info!(
                        run_id = %run_id,
                        target = %outcome.target,
                        outcome = ?outcome.outcome,
                        "delivery outcome"
                    );
                }
                outcomes
            }
            Err(e) => {
                // The per-target contract holds even when delivery cannot
                // start at all: every enabled target reports the failure.
                warn!(run_id = %run_id, "delivery failed before any upload: {e}");
                let message = e.to_string();
                request
                    .webhooks
                    .iter()
                    .map(|t| TargetOutcome {
                        target: t.name.clone(),
                        outcome: if t.enabled {
                            DeliveryOutcome::NetworkError {
                                message: message.clone(),
                            }
                        } else {
                            DeliveryOutcome::Skipped
                        },
                    })
                    .collect()
            }
        }
    }
}

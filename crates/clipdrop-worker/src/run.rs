//! Worker-task orchestration and the UI-facing event channel.
//!
//! The controller's state machine runs on a spawned worker task; all
//! outward communication crosses one channel carrying progress and the
//! final report. The caller keeps a [`RunHandle`] to observe events and
//! request cancellation.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use clipdrop_models::{ProgressUpdate, RunReport};

use crate::config::RunConfig;
use crate::controller::{FfmpegAttemptRunner, ProgressSink, RunRequest, SizeFitController};
use crate::error::RunError;

/// Events emitted by a running clip job.
#[derive(Debug)]
pub enum RunEvent {
    Progress(ProgressUpdate),
    /// Terminal: the run reached an outcome or failed fast
    Finished(Result<RunReport, RunError>),
}

/// Handle to a spawned run: event stream plus cancellation.
pub struct RunHandle {
    events: mpsc::UnboundedReceiver<RunEvent>,
    cancel: Arc<watch::Sender<bool>>,
    task: JoinHandle<()>,
}

/// Cancellation handle usable independently of the event stream.
#[derive(Clone)]
pub struct Canceller {
    tx: Arc<watch::Sender<bool>>,
}

impl Canceller {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl RunHandle {
    /// Request cooperative cancellation. The run winds down promptly
    /// and still emits a final [`RunEvent::Finished`].
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Detached cancellation handle for use while the event stream is
    /// mutably borrowed elsewhere.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            tx: Arc::clone(&self.cancel),
        }
    }

    /// Next event, or `None` once the channel closes after the final
    /// report.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Drain events until the run finishes, discarding progress.
    pub async fn wait(mut self) -> Result<RunReport, RunError> {
        while let Some(event) = self.events.recv().await {
            if let RunEvent::Finished(result) = event {
                return result;
            }
        }
        // The worker task never drops the channel before sending
        // Finished unless it panicked.
        self.task.abort();
        Err(RunError::Io(std::io::Error::other(
            "run task ended without a report",
        )))
    }
}

/// Channel-backed sink that keeps the observed percent monotonically
/// non-decreasing.
struct ChannelSink {
    tx: mpsc::UnboundedSender<RunEvent>,
    last_percent: AtomicU8,
}

impl ProgressSink for ChannelSink {
    fn update(&self, update: ProgressUpdate) {
        let previous = self.last_percent.fetch_max(update.percent, Ordering::AcqRel);
        let percent = update.percent.max(previous);
        let _ = self.tx.send(RunEvent::Progress(ProgressUpdate::new(
            percent,
            update.phase,
        )));
    }
}

/// Spawn a clip run on a worker task.
///
/// One handle corresponds to exactly one run; the request (and its
/// run state) is consumed, so a new request for the same clip cannot
/// start until this one reports a terminal outcome.
pub fn spawn_run(config: RunConfig, request: RunRequest) -> RunHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let sink = Arc::new(ChannelSink {
        tx: tx.clone(),
        last_percent: AtomicU8::new(0),
    });

    let task = tokio::spawn(async move {
        let runner = FfmpegAttemptRunner::from_config(&config);
        let controller = SizeFitController::new(config, runner);
        let result = controller.run(request, sink, cancel_rx).await;
        let _ = tx.send(RunEvent::Finished(result));
    });

    RunHandle {
        events: rx,
        cancel: Arc::new(cancel_tx),
        task,
    }
}

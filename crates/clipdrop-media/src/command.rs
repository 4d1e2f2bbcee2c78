//! FFmpeg command builder and process supervision.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{parse_progress_line, FfmpegProgress};

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an input argument (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add multiple input arguments.
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set seek position (before input, frame-accurate enough for clips).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Set output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Move the moov atom up front so clips start playing while
    /// still downloading.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Output path this command writes.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite flag
        if self.overwrite {
            args.push("-y".to_string());
        }

        // Log level
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        // Input args
        args.extend(self.input_args.clone());

        // Input file
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        // Output args
        args.extend(self.output_args.clone());

        // Output file
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with progress tracking, cancellation and
/// stall detection.
pub struct FfmpegRunner {
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
    /// Kill the child when no progress block arrives within this window
    stall_timeout: Option<Duration>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self {
            cancel_rx: None,
            stall_timeout: None,
        }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set the stall window.
    pub fn with_stall_timeout(mut self, window: Duration) -> Self {
        self.stall_timeout = Some(window);
        self
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run an FFmpeg command, forwarding each parsed progress snapshot.
    ///
    /// The child is killed promptly when the cancellation signal flips or
    /// when no progress arrives within the stall window.
    pub async fn run_with_progress<F>(
        &self,
        cmd: &FfmpegCommand,
        mut progress_callback: F,
    ) -> MediaResult<()>
    where
        F: FnMut(FfmpegProgress) + Send,
    {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child.stderr.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("stderr not captured", None, None)
        })?;
        let mut reader = BufReader::new(stderr).lines();

        // Progress snapshots flow from the reader task into the
        // supervision loop below.
        let (tx, mut rx) = mpsc::channel::<FfmpegProgress>(64);
        let reader_task = tokio::spawn(async move {
            let mut current = FfmpegProgress::default();
            while let Ok(Some(line)) = reader.next_line().await {
                if let Some(snapshot) = parse_progress_line(&line, &mut current) {
                    if tx.send(snapshot).await.is_err() {
                        break;
                    }
                }
            }
        });

        // A year-long window stands in for "no stall detection".
        let window = self
            .stall_timeout
            .unwrap_or(Duration::from_secs(365 * 86_400));
        let mut deadline = Instant::now() + window;
        let mut cancel_rx = self.cancel_rx.clone();
        let mut progress_open = true;

        let status = loop {
            tokio::select! {
                status = child.wait() => break status?,
                maybe = rx.recv(), if progress_open => match maybe {
                    Some(snapshot) => {
                        deadline = Instant::now() + window;
                        progress_callback(snapshot);
                    }
                    None => progress_open = false,
                },
                _ = cancellation(&mut cancel_rx) => {
                    info!("FFmpeg cancelled, killing process");
                    let _ = child.kill().await;
                    reader_task.abort();
                    return Err(MediaError::Cancelled);
                }
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(
                        "FFmpeg made no progress for {}s, killing process",
                        window.as_secs()
                    );
                    let _ = child.kill().await;
                    reader_task.abort();
                    return Err(MediaError::Stalled(window.as_secs()));
                }
            }
        };

        // Deliver the final progress blocks emitted just before exit.
        let _ = reader_task.await;
        while let Ok(snapshot) = rx.try_recv() {
            progress_callback(snapshot);
        }

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                None,
                status.code(),
            ))
        }
    }
}

/// Resolves once the cancellation signal flips to true; pends forever
/// when no signal is attached or the sender hangs up without cancelling.
async fn cancellation(rx: &mut Option<watch::Receiver<bool>>) {
    match rx {
        Some(rx) => {
            if *rx.borrow() {
                return;
            }
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    return;
                }
            }
            std::future::pending::<()>().await
        }
        None => std::future::pending().await,
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .seek(10.0)
            .duration(30.0)
            .video_codec("libx264")
            .audio_codec("aac")
            .audio_bitrate("128k")
            .faststart();

        let args = cmd.build_args();
        assert!(args.contains(&"-ss".to_string()));
        assert!(args.contains(&"10.000".to_string()));
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"+faststart".to_string()));

        // Seek must come before the input file
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);

        // Duration applies to the output side
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert!(t > input);
    }

    #[test]
    fn test_progress_pipe_requested() {
        let args = FfmpegCommand::new("in.mp4", "out.mp4").build_args();
        let progress = args.iter().position(|a| a == "-progress").unwrap();
        assert_eq!(args[progress + 1], "pipe:2");
    }
}

//! ClipDrop worker binary: runs one clip job from the command line.
//!
//! The UI collaborator normally drives runs through [`clipdrop_worker::spawn_run`];
//! this binary is the same entry point wired to argv and environment
//! variables, handy for scripting and debugging.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipdrop_delivery::load_targets;
use clipdrop_media::probe_video;
use clipdrop_models::{ClipSpec, PlanMode, RunOutcome, SizeBudget, DISCORD_MAX_UPLOAD_BYTES};
use clipdrop_worker::{candidates_from_env, spawn_run, RunConfig, RunEvent, RunRequest};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 4 {
        bail!("usage: clipdrop-worker <source> <start-secs> <end-secs> <output> [webhooks.json]");
    }

    let source = PathBuf::from(&args[0]);
    let start_secs: f64 = args[1].parse().context("start-secs must be a number")?;
    let end_secs: f64 = args[2].parse().context("end-secs must be a number")?;
    let output = PathBuf::from(&args[3]);

    let config = RunConfig::from_env();

    let video = probe_video(&source).await.context("failed to probe source")?;
    info!(
        duration = video.duration,
        width = video.width,
        height = video.height,
        fps = video.fps,
        "probed source"
    );

    let clip = ClipSpec {
        source,
        start_secs,
        end_secs,
        source_duration: Some(video.duration),
        width: video.width,
        height: video.height,
        fps: video.fps,
        bitrate: video.bitrate,
    };

    let budget = match env_parse::<f64>("CLIPDROP_MAX_MB") {
        Some(mb) => SizeBudget::new((mb * 1024.0 * 1024.0) as u64, config.size_tolerance),
        None => SizeBudget::new(DISCORD_MAX_UPLOAD_BYTES, config.size_tolerance),
    };

    let mode = match env_parse::<u64>("CLIPDROP_CUSTOM_BITRATE_KBPS") {
        Some(kbps) => PlanMode::Custom {
            bitrate_bps: kbps * 1000,
        },
        None => PlanMode::SizeFit,
    };

    let webhooks = match args.get(4) {
        Some(path) => load_targets(path)
            .await
            .context("failed to load webhook list")?,
        None => Vec::new(),
    };

    let request = RunRequest {
        clip,
        budget,
        mode,
        candidates: candidates_from_env(),
        output,
        title: std::env::var("CLIPDROP_TITLE").ok(),
        webhooks,
    };

    let mut handle = spawn_run(config, request);
    let canceller = handle.canceller();

    let report = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("cancellation requested");
                canceller.cancel();
            }
            event = handle.next_event() => match event {
                Some(RunEvent::Progress(update)) => {
                    info!(percent = update.percent, phase = update.phase.as_str(), "progress");
                }
                Some(RunEvent::Finished(result)) => break result?,
                None => bail!("run ended without a report"),
            }
        }
    };

    for delivery in &report.delivery {
        info!(target = %delivery.target, outcome = ?delivery.outcome, "webhook delivery");
    }

    // Machine-readable report on stdout; logs stay on stderr.
    println!("{}", serde_json::to_string_pretty(&report)?);

    match &report.outcome {
        RunOutcome::Accepted { path, bytes } => {
            info!(path = %path.display(), bytes, "clip ready");
            Ok(())
        }
        RunOutcome::Failed { reason } => {
            error!(%reason, "clip run failed");
            std::process::exit(1);
        }
        RunOutcome::Cancelled => {
            info!("clip run cancelled");
            std::process::exit(130);
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

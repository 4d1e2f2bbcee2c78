//! Encode ladder construction.
//!
//! The ladder is a cross-join of resolution tiers (descending, never
//! upscaling) with encoder candidates (probe priority order): every
//! candidate gets its shot at a tier before the plan steps down, so a
//! hardware failure at one tier does not abandon hardware outright.
//! Bitrate is driven purely by budget and duration; stepping down in
//! resolution is a quality lever, not a bitrate lever.

use std::collections::HashSet;
use tracing::{debug, warn};

use clipdrop_models::{
    ClipSpec, EncodePlanStep, EncoderBackend, EncoderCandidate, PlanMode, ResolutionTier,
    SizeBudget, DEFAULT_TIERS,
};

use crate::config::RunConfig;

const FULL_HD_PIXELS: f64 = 1920.0 * 1080.0;

/// Build the ordered sequence of encode steps for one run.
///
/// Guaranteed non-empty: when every rule would reject a step, the lowest
/// tier with the software encoder is appended as a last resort.
pub fn build_ladder(
    clip: &ClipSpec,
    budget: &SizeBudget,
    mode: PlanMode,
    candidates: &[EncoderCandidate],
    config: &RunConfig,
) -> Vec<EncodePlanStep> {
    let ordered = ordered_candidates(candidates, config);
    let mut steps = Vec::new();

    match mode {
        PlanMode::SizeFit => {
            let bitrate_bps = target_bitrate_bps(budget, clip.duration(), config);
            let tiers = tiers_for(clip);
            let last_idx = tiers.len().saturating_sub(1);

            for (idx, tier) in tiers.iter().enumerate() {
                // A bitrate far below what the tier needs would produce a
                // guaranteed-bad encode; skip ahead instead of wasting the
                // attempt. The lowest tier always stays.
                if idx != last_idx && bitrate_bps < tier_floor_bps(tier, config) {
                    debug!(tier = %tier, bitrate_bps, "bitrate below tier floor, skipping tier");
                    continue;
                }
                for candidate in &ordered {
                    steps.push(step(clip, tier.clone(), bitrate_bps, *candidate));
                }
            }
        }
        PlanMode::Custom { bitrate_bps } => {
            // The user chose the bitrate; one resolution, no stepping down.
            // Hardware fallback at that tier still applies.
            let tier = ResolutionTier::source(clip.width, clip.height);
            for candidate in &ordered {
                steps.push(step(clip, tier.clone(), bitrate_bps, *candidate));
            }
        }
    }

    if steps.is_empty() {
        warn!("ladder rules produced no steps, appending software last resort");
        let tier = tiers_for(clip)
            .into_iter()
            .last()
            .unwrap_or_else(|| ResolutionTier::new(640, 360, "360p"));
        let bitrate_bps = match mode {
            PlanMode::SizeFit => target_bitrate_bps(budget, clip.duration(), config),
            PlanMode::Custom { bitrate_bps } => bitrate_bps,
        };
        steps.push(step(
            clip,
            tier,
            bitrate_bps,
            EncoderCandidate::new(EncoderBackend::Software, u32::MAX),
        ));
    }

    steps
}

/// Video bitrate from the byte budget, independent of resolution.
///
/// `(budget * safety_factor * 8 - audio_bits) / duration`, floored at
/// the absolute minimum video bitrate.
pub fn target_bitrate_bps(budget: &SizeBudget, duration_secs: f64, config: &RunConfig) -> u64 {
    let floor = config.min_video_bitrate_kbps as u64 * 1000;
    if duration_secs <= 0.0 {
        return floor;
    }

    let effective_bytes = budget.target_bytes as f64 * config.safety_factor;
    let audio_bits = config.audio_reserve_kbps as f64 * 1000.0 * duration_secs;
    let video_bits = effective_bytes * 8.0 - audio_bits;

    if video_bits <= 0.0 {
        warn!(
            target_bytes = budget.target_bytes,
            duration_secs, "budget too small to cover audio, using minimum video bitrate"
        );
        return floor;
    }

    ((video_bits / duration_secs) as u64).max(floor)
}

/// Tiers to try, highest pixel area first: the source resolution, then
/// every default tier that is not an upscale, deduplicated.
fn tiers_for(clip: &ClipSpec) -> Vec<ResolutionTier> {
    let mut tiers = Vec::new();
    let mut seen = HashSet::new();

    if clip.width > 0 && clip.height > 0 {
        tiers.push(ResolutionTier::source(clip.width, clip.height));
        seen.insert((clip.width, clip.height));
    }

    for (width, height, label) in DEFAULT_TIERS {
        let upscale =
            clip.width > 0 && clip.height > 0 && (width > clip.width || height > clip.height);
        if !upscale && seen.insert((width, height)) {
            tiers.push(ResolutionTier::new(width, height, label));
        }
    }

    tiers.sort_by(|a, b| b.pixels().cmp(&a.pixels()));
    tiers
}

/// Per-tier quality floor, scaled by pixel area relative to 1080p.
fn tier_floor_bps(tier: &ResolutionTier, config: &RunConfig) -> u64 {
    let area_scale = (tier.pixels() as f64 / FULL_HD_PIXELS).min(1.0);
    (config.tier_floor_kbps as f64 * area_scale * 1000.0) as u64
}

fn ordered_candidates(candidates: &[EncoderCandidate], config: &RunConfig) -> Vec<EncoderCandidate> {
    let mut ordered: Vec<EncoderCandidate> = if config.force_software {
        candidates
            .iter()
            .copied()
            .filter(|c| c.backend == EncoderBackend::Software)
            .collect()
    } else {
        candidates.to_vec()
    };

    if ordered.is_empty() {
        ordered = EncoderCandidate::software_only();
    }
    ordered.sort_by_key(|c| c.rank);
    ordered
}

fn step(
    clip: &ClipSpec,
    tier: ResolutionTier,
    bitrate_bps: u64,
    candidate: EncoderCandidate,
) -> EncodePlanStep {
    let is_source_resolution = tier.width == clip.width && tier.height == clip.height;
    EncodePlanStep {
        tier,
        bitrate_bps,
        candidate,
        is_source_resolution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn clip_1080p60() -> ClipSpec {
        ClipSpec {
            source: PathBuf::from("/tmp/recording.mp4"),
            start_secs: 0.0,
            end_secs: 60.0,
            source_duration: Some(300.0),
            width: 1920,
            height: 1080,
            fps: 60.0,
            bitrate: 20_000_000,
        }
    }

    fn nvenc_and_software() -> Vec<EncoderCandidate> {
        vec![
            EncoderCandidate::new(EncoderBackend::Nvenc, 0),
            EncoderCandidate::new(EncoderBackend::Software, 1),
        ]
    }

    #[test]
    fn test_discord_scenario_first_step() {
        // 60s clip, 10 MiB budget, 1080p60 source, NVENC preferred
        let mut config = RunConfig::default();
        config.safety_factor = 0.92;

        let clip = clip_1080p60();
        let budget = SizeBudget::for_discord();
        let ladder = build_ladder(&clip, &budget, PlanMode::SizeFit, &nvenc_and_software(), &config);

        let first = &ladder[0];
        assert_eq!(first.tier.label, "source");
        assert!(first.is_source_resolution);
        assert_eq!(first.candidate.backend, EncoderBackend::Nvenc);
        // ~1.2 Mbps: (10 MiB * 0.92 * 8 - audio bits) / 60s
        assert!(first.bitrate_bps > 1_100_000 && first.bitrate_bps < 1_300_000);
    }

    #[test]
    fn test_cross_join_all_candidates_per_tier() {
        let clip = clip_1080p60();
        let budget = SizeBudget::for_discord();
        let ladder = build_ladder(
            &clip,
            &budget,
            PlanMode::SizeFit,
            &nvenc_and_software(),
            &RunConfig::default(),
        );

        // 1920x1080 source dedups the 1080p default: source, 720p, 480p, 360p
        assert_eq!(ladder.len(), 8);
        assert_eq!(ladder[0].candidate.backend, EncoderBackend::Nvenc);
        assert_eq!(ladder[1].candidate.backend, EncoderBackend::Software);
        assert_eq!(ladder[0].tier.label, "source");
        assert_eq!(ladder[1].tier.label, "source");
        assert_eq!(ladder[2].tier.label, "720p");
    }

    #[test]
    fn test_ladder_never_increases_pixels() {
        let clip = clip_1080p60();
        let budget = SizeBudget::for_discord();
        let ladder = build_ladder(
            &clip,
            &budget,
            PlanMode::SizeFit,
            &nvenc_and_software(),
            &RunConfig::default(),
        );

        let source_pixels = clip.pixels();
        for pair in ladder.windows(2) {
            assert!(pair[0].tier.pixels() >= pair[1].tier.pixels());
        }
        assert!(ladder.iter().all(|s| s.tier.pixels() <= source_pixels));
    }

    #[test]
    fn test_never_upscales_small_source() {
        let mut clip = clip_1080p60();
        clip.width = 1280;
        clip.height = 720;

        let ladder = build_ladder(
            &clip,
            &SizeBudget::for_discord(),
            PlanMode::SizeFit,
            &nvenc_and_software(),
            &RunConfig::default(),
        );

        assert!(ladder.iter().all(|s| s.tier.pixels() <= clip.pixels()));
        // 1280x720 dedups the 720p default tier
        assert!(!ladder.iter().any(|s| s.tier.label == "720p"));
    }

    #[test]
    fn test_bitrate_identical_across_tiers() {
        let clip = clip_1080p60();
        let ladder = build_ladder(
            &clip,
            &SizeBudget::for_discord(),
            PlanMode::SizeFit,
            &nvenc_and_software(),
            &RunConfig::default(),
        );

        let first = ladder[0].bitrate_bps;
        assert!(ladder.iter().all(|s| s.bitrate_bps == first));
    }

    #[test]
    fn test_starved_budget_skips_high_tiers() {
        // 0.5 MiB for 60s computes to the absolute floor, well under
        // what the source tier needs to look acceptable.
        let clip = clip_1080p60();
        let budget = SizeBudget::new(512 * 1024, 0.0);
        let ladder = build_ladder(
            &clip,
            &budget,
            PlanMode::SizeFit,
            &nvenc_and_software(),
            &RunConfig::default(),
        );

        assert!(!ladder.is_empty());
        assert_ne!(ladder[0].tier.label, "source");
        assert!(ladder[0].tier.pixels() < clip.pixels());
    }

    #[test]
    fn test_budget_smaller_than_audio_uses_floor() {
        let config = RunConfig::default();
        let budget = SizeBudget::new(100_000, 0.0);
        let bitrate = target_bitrate_bps(&budget, 60.0, &config);
        assert_eq!(bitrate, config.min_video_bitrate_kbps as u64 * 1000);
    }

    #[test]
    fn test_custom_mode_single_tier_at_user_bitrate() {
        let clip = clip_1080p60();
        let ladder = build_ladder(
            &clip,
            &SizeBudget::for_discord(),
            PlanMode::Custom {
                bitrate_bps: 8_000_000,
            },
            &nvenc_and_software(),
            &RunConfig::default(),
        );

        // One tier, cross-joined with candidates for hardware fallback
        assert_eq!(ladder.len(), 2);
        assert!(ladder.iter().all(|s| s.tier.label == "source"));
        assert!(ladder.iter().all(|s| s.bitrate_bps == 8_000_000));
        assert_eq!(ladder[0].candidate.backend, EncoderBackend::Nvenc);
    }

    #[test]
    fn test_empty_candidate_list_falls_back_to_software() {
        let clip = clip_1080p60();
        let ladder = build_ladder(
            &clip,
            &SizeBudget::for_discord(),
            PlanMode::SizeFit,
            &[],
            &RunConfig::default(),
        );

        assert!(!ladder.is_empty());
        assert!(ladder
            .iter()
            .all(|s| s.candidate.backend == EncoderBackend::Software));
    }

    #[test]
    fn test_force_software_filters_hardware() {
        let mut config = RunConfig::default();
        config.force_software = true;

        let clip = clip_1080p60();
        let ladder = build_ladder(
            &clip,
            &SizeBudget::for_discord(),
            PlanMode::SizeFit,
            &nvenc_and_software(),
            &config,
        );

        assert!(!ladder.is_empty());
        assert!(ladder
            .iter()
            .all(|s| s.candidate.backend == EncoderBackend::Software));
    }
}

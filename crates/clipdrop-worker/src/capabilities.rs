//! Capability-probe boundary.
//!
//! Hardware detection itself lives outside this core; whatever probes
//! the machine hands over an ordered encoder list, hardware before
//! software. The worker binary reads that list from `CLIPDROP_ENCODERS`
//! (e.g. `nvenc,software`) as its stand-in for the probe.

use tracing::warn;

use clipdrop_models::{EncoderBackend, EncoderCandidate};

/// Parse an ordered, comma-separated encoder list into candidates.
///
/// Unknown names are dropped with a warning; duplicates keep their
/// first (highest-priority) position.
pub fn parse_candidates(spec: &str) -> Vec<EncoderCandidate> {
    let mut seen = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.parse::<EncoderBackend>() {
            Ok(backend) if !seen.contains(&backend) => seen.push(backend),
            Ok(_) => {}
            Err(e) => warn!("ignoring encoder entry: {e}"),
        }
    }
    seen.into_iter()
        .enumerate()
        .map(|(rank, backend)| EncoderCandidate::new(backend, rank as u32))
        .collect()
}

/// Candidate list from `CLIPDROP_ENCODERS`, or software-only when the
/// variable is unset or yields nothing usable.
pub fn candidates_from_env() -> Vec<EncoderCandidate> {
    let parsed = std::env::var("CLIPDROP_ENCODERS")
        .map(|spec| parse_candidates(&spec))
        .unwrap_or_default();
    if parsed.is_empty() {
        EncoderCandidate::software_only()
    } else {
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ordered_list() {
        let candidates = parse_candidates("nvenc, vaapi, software");
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].backend, EncoderBackend::Nvenc);
        assert_eq!(candidates[0].rank, 0);
        assert_eq!(candidates[2].backend, EncoderBackend::Software);
        assert_eq!(candidates[2].rank, 2);
    }

    #[test]
    fn test_parse_drops_unknown_and_duplicates() {
        let candidates = parse_candidates("nvenc,quantum,nvenc,software");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].backend, EncoderBackend::Nvenc);
        assert_eq!(candidates[1].backend, EncoderBackend::Software);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_candidates("").is_empty());
        assert!(parse_candidates(" , ,").is_empty());
    }
}

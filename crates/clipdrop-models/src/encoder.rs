//! Encoder backends and capability candidates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of H.264 encoder backends the executor knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderBackend {
    /// NVIDIA NVENC
    Nvenc,
    /// AMD Advanced Media Framework
    Amf,
    /// Intel QuickSync
    Qsv,
    /// VA-API (Linux)
    Vaapi,
    /// libx264 software fallback
    Software,
}

impl EncoderBackend {
    /// FFmpeg codec name for this backend.
    pub fn codec_name(&self) -> &'static str {
        match self {
            EncoderBackend::Nvenc => "h264_nvenc",
            EncoderBackend::Amf => "h264_amf",
            EncoderBackend::Qsv => "h264_qsv",
            EncoderBackend::Vaapi => "h264_vaapi",
            EncoderBackend::Software => "libx264",
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, EncoderBackend::Software)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderBackend::Nvenc => "nvenc",
            EncoderBackend::Amf => "amf",
            EncoderBackend::Qsv => "qsv",
            EncoderBackend::Vaapi => "vaapi",
            EncoderBackend::Software => "software",
        }
    }
}

impl fmt::Display for EncoderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncoderBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nvenc" | "h264_nvenc" => Ok(EncoderBackend::Nvenc),
            "amf" | "h264_amf" => Ok(EncoderBackend::Amf),
            "qsv" | "h264_qsv" => Ok(EncoderBackend::Qsv),
            "vaapi" | "h264_vaapi" => Ok(EncoderBackend::Vaapi),
            "software" | "libx264" | "h264" => Ok(EncoderBackend::Software),
            other => Err(format!("unknown encoder backend: {other}")),
        }
    }
}

/// One usable encoder reported by the capability probe.
///
/// Candidates arrive ordered hardware-before-software; `rank` preserves
/// that ordering (lower ranks are tried first). Liveness is run-local
/// state kept by the controller, not a property of the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderCandidate {
    pub backend: EncoderBackend,
    pub rank: u32,
}

impl EncoderCandidate {
    pub fn new(backend: EncoderBackend, rank: u32) -> Self {
        Self { backend, rank }
    }

    /// The candidate list used when no probe result is available.
    pub fn software_only() -> Vec<EncoderCandidate> {
        vec![EncoderCandidate::new(EncoderBackend::Software, 0)]
    }
}

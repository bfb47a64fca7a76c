//! Voice activity detection over fixed-length energy windows.
//!
//! The detector produces two tracks per input, one value per window:
//! a linear energy track (`vad`, positive means speech) and a log-ratio
//! track (`log_vad`) used by the coarse aligner.

pub mod energy;

pub use energy::EnergyVad;

/// Per-window activity of one track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityTrack {
    /// Window energy; zero outside speech, tapered at burst edges.
    pub vad: Vec<f32>,
    /// `ln(vad / threshold)` where `vad > threshold`, else 0.
    pub log_vad: Vec<f32>,
    /// Final speech/noise threshold.
    pub threshold: f32,
}

impl ActivityTrack {
    pub fn len(&self) -> usize {
        self.vad.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vad.is_empty()
    }

    /// `true` if any window is marked active.
    pub fn has_speech(&self) -> bool {
        self.vad.iter().any(|&v| v > 0.0)
    }
}

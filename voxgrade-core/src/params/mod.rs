//! Fixed model constants and the per-bandwidth parameter set.
//!
//! Nothing here is a runtime tunable: the values are those of the published
//! P.862 model and must stay put for scores to be comparable. The only
//! choice a caller makes is the [`Bandwidth`], which fixes the working rate.

pub mod tables;

use serde::{Deserialize, Serialize};

pub use tables::BarkTable;

// ---------------------------------------------------------------------------
// Rate-independent constants
// ---------------------------------------------------------------------------

/// Guard region at both signal edges, in VAD windows.
pub const SEARCHBUFFER: usize = 75;
/// Trailing zero padding appended to every track, in milliseconds.
pub const DATAPADDING_MS: usize = 320;
/// Speech bursts this short (in windows) are discarded by the VAD.
pub const MIN_SPEECH_LEN: usize = 4;
/// Gaps this short (in windows) between bursts are bridged by the VAD.
pub const JOIN_SPEECH_LEN: usize = 50;
/// Minimum speech run (in windows) to open a search window.
pub const MIN_PIECE_LEN: i64 = 50;
/// Cap on the number of speech pieces.
pub const MAX_PIECES: usize = 50;
/// Speech interior (in windows) a piece needs before split detection runs.
pub const MIN_SPLIT_SPEECH_LEN: i64 = 200;
/// Cap on breakpoint candidates probed per piece.
pub const MAX_SPLIT_CANDIDATES: usize = 40;

/// Mean power both tracks are normalized to.
pub const TARGET_AVG_POWER: f64 = 1e7;

pub const CRITERIUM_FOR_SILENCE_OF_5_SAMPLES: f32 = 500.0;
pub const NUMBER_OF_PSQM_FRAMES_PER_SYLLABE: usize = 20;
pub const THRESHOLD_BAD_FRAMES: f32 = 30.0;
pub const SMEAR_RANGE: usize = 2;
pub const MINIMUM_NUMBER_OF_BAD_FRAMES_IN_BAD_INTERVAL: usize = 5;
pub const SEARCH_RANGE_IN_TRANSFORM_LENGTH: usize = 4;
pub const MAX_NUMBER_OF_BAD_INTERVALS: usize = 1000;

pub const ZWICKER_POWER: f64 = 0.23;
pub const MAX_SCALE: f32 = 5.0;
pub const MIN_SCALE: f32 = 3e-4;

pub const D_POW_F: f32 = 2.0;
pub const D_POW_S: f32 = 6.0;
pub const D_POW_T: f32 = 2.0;
pub const A_POW_F: f32 = 1.0;
pub const A_POW_S: f32 = 6.0;
pub const A_POW_T: f32 = 2.0;
pub const D_WEIGHT: f64 = 0.1;
pub const A_WEIGHT: f64 = 0.0309;

/// VAD windows per perceptual-model frame (`Nf = 8 * DOWNSAMPLE`).
pub const FRAME_WINDOWS: usize = 8;

// ---------------------------------------------------------------------------
// Bandwidth selection
// ---------------------------------------------------------------------------

/// Working-rate variant of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bandwidth {
    /// 8 kHz telephone band.
    Narrowband,
    /// 16 kHz wideband.
    #[default]
    Wideband,
}

/// Resolved constants for one [`Bandwidth`].
#[derive(Debug, Clone, Copy)]
pub struct ModelParams {
    pub bandwidth: Bandwidth,
    /// Working sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per VAD window.
    pub downsample: usize,
    /// Frame length of the fine-alignment sweep.
    pub align_nfft: usize,
    /// Input conditioning filter, one `[b0, b1, b2, a1, a2]` per section.
    pub input_iir: &'static [[f32; 5]],
    pub bark: &'static BarkTable,
}

impl ModelParams {
    pub fn for_bandwidth(bandwidth: Bandwidth) -> Self {
        match bandwidth {
            Bandwidth::Narrowband => Self {
                bandwidth,
                sample_rate: 8_000,
                downsample: 32,
                align_nfft: 512,
                input_iir: &tables::INPUT_IIR_8K,
                bark: &tables::BARK_8K,
            },
            Bandwidth::Wideband => Self {
                bandwidth,
                sample_rate: 16_000,
                downsample: 64,
                align_nfft: 1024,
                input_iir: &tables::INPUT_IIR_16K,
                bark: &tables::BARK_16K,
            },
        }
    }

    /// Guard region in samples (`SEARCHBUFFER * DOWNSAMPLE`).
    pub fn guard(&self) -> usize {
        SEARCHBUFFER * self.downsample
    }

    /// Trailing padding in samples.
    pub fn padding(&self) -> usize {
        DATAPADDING_MS * self.sample_rate as usize / 1000
    }

    /// Perceptual-model frame length `Nf`.
    pub fn frame_len(&self) -> usize {
        FRAME_WINDOWS * self.downsample
    }

    /// Shortest usable track: a quarter second after guard trimming.
    pub fn min_usable_samples(&self) -> usize {
        self.sample_rate as usize / 4
    }

    /// Samples to milliseconds at the working rate.
    pub fn samples_to_ms(&self, samples: i64) -> f64 {
        samples as f64 * 1000.0 / self.sample_rate as f64
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::for_bandwidth(Bandwidth::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_halves_match_bark_bins() {
        for bw in [Bandwidth::Narrowband, Bandwidth::Wideband] {
            let p = ModelParams::for_bandwidth(bw);
            let bins: usize = p.bark.hz_bins_per_band().iter().sum();
            assert_eq!(bins, p.frame_len() / 2, "{bw:?}");
        }
    }

    #[test]
    fn wideband_is_default() {
        let p = ModelParams::default();
        assert_eq!(p.sample_rate, 16_000);
        assert_eq!(p.guard(), 4_800);
        assert_eq!(p.padding(), 5_120);
    }
}

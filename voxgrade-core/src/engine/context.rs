//! Per-call rating state.
//!
//! A `RatingContext` is built once per rating, mutated in place by every
//! stage of [`measure`](super::pipeline::measure) and dropped after the score
//! is read. Nothing in it outlives the call.

use crate::{
    buffering::{AlignArena, Signal},
    dsp::FftContext,
    params::ModelParams,
    vad::ActivityTrack,
};

/// One input track: samples plus their activity tracks.
#[derive(Debug, Clone)]
pub struct SignalInfo {
    /// Sample count before padding.
    pub n_samples: usize,
    /// `n_samples` of audio followed by `DATAPADDING` zeros.
    pub data: Signal,
    /// Per-window activity, `n_samples / DOWNSAMPLE` long.
    pub activity: ActivityTrack,
}

impl SignalInfo {
    pub fn new(samples: Vec<f32>, params: &ModelParams) -> Self {
        let n_samples = samples.len();
        let windows = n_samples / params.downsample;
        Self {
            n_samples,
            data: Signal::from_samples(samples, n_samples + params.padding()),
            activity: ActivityTrack {
                vad: vec![0.0; windows],
                log_vad: vec![0.0; windows],
                threshold: 0.0,
            },
        }
    }

    /// Number of VAD windows.
    pub fn vad_len(&self) -> usize {
        self.activity.vad.len()
    }

    pub fn vad(&self) -> &[f32] {
        &self.activity.vad
    }

    pub fn log_vad(&self) -> &[f32] {
        &self.activity.log_vad
    }
}

/// A contiguous speech segment with its own alignment.
///
/// Boundaries are in VAD windows, delays in samples (positive means the
/// degraded track is late).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Piece {
    pub search_start: i64,
    pub search_end: i64,
    /// Coarse delay from the log-VAD correlation.
    pub delay_est: i64,
    /// Sample-resolution delay.
    pub delay: i64,
    pub confidence: f32,
    pub start: i64,
    pub end: i64,
}

pub struct RatingContext {
    pub params: ModelParams,
    pub src: SignalInfo,
    pub rec: SignalInfo,
    /// Ordered, non-overlapping once boundaries are finalized.
    pub pieces: Vec<Piece>,
    /// Scratch slot for the split search; never part of `pieces`.
    pub probe: Piece,
    /// Whole-signal coarse delay in samples.
    pub crude_delay: i64,
    pub d_indicator: f32,
    pub a_indicator: f32,
    /// Unclamped model output.
    pub rate: f32,
    pub(crate) fft: FftContext,
    pub(crate) arena: AlignArena,
}

impl RatingContext {
    pub fn new(params: ModelParams, reference: Vec<f32>, degraded: Vec<f32>) -> Self {
        Self {
            src: SignalInfo::new(reference, &params),
            rec: SignalInfo::new(degraded, &params),
            pieces: Vec::new(),
            probe: Piece::default(),
            crude_delay: 0,
            d_indicator: 0.0,
            a_indicator: 0.0,
            rate: 0.0,
            fft: FftContext::new(),
            arena: AlignArena::new(params.align_nfft),
            params,
        }
    }

    /// Length of the longer track, before padding.
    pub fn max_n_samples(&self) -> usize {
        self.src.n_samples.max(self.rec.n_samples)
    }
}

impl std::fmt::Debug for RatingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatingContext")
            .field("bandwidth", &self.params.bandwidth)
            .field("src_samples", &self.src.n_samples)
            .field("rec_samples", &self.rec.n_samples)
            .field("pieces", &self.pieces)
            .field("crude_delay", &self.crude_delay)
            .field("rate", &self.rate)
            .finish()
    }
}

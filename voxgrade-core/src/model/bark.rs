//! Short-term spectra and their mapping onto the Bark scale.
//!
//! ## Algorithm
//!
//! 1. Hann-window `Nf` samples, FFT, keep the power of bins `0..Nf/2`
//!    (bin 0 zeroed).
//! 2. Frequency warping: sum consecutive Hz bins into Bark bands, scale by
//!    the per-band density correction and `Sp`.
//! 3. Intensity warping: Zwicker loudness per band, above the absolute
//!    hearing threshold only.

use ndarray::{Array2, ArrayView1, ArrayViewMut1};

use crate::{buffering::Signal, dsp::FftContext, params::BarkTable, params::ZWICKER_POWER};

/// Reusable Hann-windowed power-spectrum analyzer for frames of `Nf`.
#[derive(Debug)]
pub struct FrameAnalyzer {
    window: Vec<f32>,
    buf: Vec<f32>,
    bins: Vec<f32>,
}

impl FrameAnalyzer {
    pub fn new(frame_len: usize) -> Self {
        let window = (0..frame_len)
            .map(|n| {
                (0.5 * (1.0 - (std::f64::consts::TAU * n as f64 / frame_len as f64).cos())) as f32
            })
            .collect();
        Self {
            window,
            buf: vec![0.0; frame_len + 2],
            bins: vec![0.0; frame_len / 2],
        }
    }

    pub fn frame_len(&self) -> usize {
        self.window.len()
    }

    /// Power spectrum of the frame of `data` starting at `start`. Samples
    /// outside the signal read as zero.
    pub fn short_term_spectrum(&mut self, fft: &mut FftContext, data: &Signal, start: i64) -> &[f32] {
        let nf = self.window.len();
        for (i, (slot, &w)) in self.buf.iter_mut().zip(&self.window).enumerate() {
            *slot = data.get_or_zero(start + i as i64) * w;
        }
        fft.real_forward(&mut self.buf, nf);
        for (k, bin) in self.bins.iter_mut().enumerate() {
            let (re, im) = (self.buf[2 * k], self.buf[2 * k + 1]);
            *bin = re * re + im * im;
        }
        if let Some(dc) = self.bins.first_mut() {
            *dc = 0.0;
        }
        &self.bins
    }

    /// All-zero spectrum, for frames whose degraded image is out of range.
    pub fn silence(&mut self) -> &[f32] {
        self.bins.fill(0.0);
        &self.bins
    }
}

/// Sum Hz bins into Bark bands.
pub fn freq_warping(hz: &[f32], bark: &BarkTable, mut out: ArrayViewMut1<'_, f32>) {
    let mut bin = 0;
    let correction = bark.pow_dens_correction();
    for (band, &n) in bark.hz_bins_per_band().iter().enumerate() {
        let sum: f64 = hz[bin..bin + n].iter().map(|&h| h as f64).sum();
        bin += n;
        out[band] = (sum * correction[band] * bark.sp) as f32;
    }
}

/// Power of bands `1..` that exceed `factor` times the hearing threshold.
pub fn total_audible(row: ArrayView1<'_, f32>, bark: &BarkTable, factor: f64) -> f32 {
    let thresh = bark.abs_thresh_power();
    let mut total = 0.0f64;
    for band in 1..bark.bands() {
        let h = row[band];
        if h > (factor * thresh[band]) as f32 {
            total += h as f64;
        }
    }
    total as f32
}

/// Per-band power over non-silent frames, counting only values 100x above
/// the hearing threshold, divided by `divisor`.
pub fn time_avg_audible(dens: &Array2<f32>, silent: &[bool], bark: &BarkTable, divisor: i64) -> Vec<f32> {
    let thresh = bark.abs_thresh_power();
    (0..bark.bands())
        .map(|band| {
            let sum: f64 = dens
                .column(band)
                .iter()
                .zip(silent)
                .filter(|&(&h, &quiet)| !quiet && h as f64 > 100.0 * thresh[band])
                .map(|(&h, _)| h as f64)
                .sum();
            if divisor > 0 {
                (sum / divisor as f64) as f32
            } else {
                0.0
            }
        })
        .collect()
}

/// Zwicker loudness density of one frame.
pub fn intensity_warping(row: ArrayView1<'_, f32>, bark: &BarkTable, out: &mut [f32]) {
    let thresh = bark.abs_thresh_power();
    let centre = bark.centre_bark();
    for band in 0..bark.bands() {
        let th = thresh[band];
        let input = row[band] as f64;

        let h = if centre[band] < 4.0 {
            6.0 / (centre[band] + 2.0)
        } else {
            1.0
        };
        let power = ZWICKER_POWER * h.min(2.0).powf(0.15);

        let loudness = if input > th {
            (th / 0.5).powf(power) * ((0.5 + 0.5 * input / th).powf(power) - 1.0)
        } else {
            0.0
        };
        out[band] = (loudness * bark.sl) as f32;
    }
}

//! Bad-interval detection and local re-alignment.
//!
//! Frames with a symmetric disturbance above `THRESHOLD_BAD_FRAMES` are
//! smeared into intervals; each long enough interval is re-correlated
//! against the reference envelope in case the piece delay was wrong there.

use tracing::warn;

use crate::{
    dsp::{next_pow2, FftContext},
    params::{
        MAX_NUMBER_OF_BAD_INTERVALS, MINIMUM_NUMBER_OF_BAD_FRAMES_IN_BAD_INTERVAL, SMEAR_RANGE,
        THRESHOLD_BAD_FRAMES,
    },
    preprocess::power_of,
};

/// Half-open frame run `[start, stop)` flagged as bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRun {
    pub start: usize,
    pub stop: usize,
}

/// Bad-frame runs over frames `0..=stop_frame`.
///
/// A frame is bad above `THRESHOLD_BAD_FRAMES` (frame 0 never is). Each
/// frame in `SMEAR_RANGE..stop_frame - SMEAR_RANGE` takes the smaller of
/// the maxima over its left and right neighbourhoods; frames outside that
/// range are never smeared bad. Runs shorter than
/// `MINIMUM_NUMBER_OF_BAD_FRAMES_IN_BAD_INTERVAL` are dropped.
pub fn find_bad_intervals(disturbance: &[f32], stop_frame: usize) -> Vec<FrameRun> {
    let n = (stop_frame + 1).min(disturbance.len());
    let mut bad: Vec<bool> = disturbance[..n]
        .iter()
        .map(|&d| d > THRESHOLD_BAD_FRAMES)
        .collect();
    if let Some(first) = bad.first_mut() {
        *first = false;
    }

    let mut smeared = vec![false; n];
    let upper = stop_frame.saturating_sub(SMEAR_RANGE).min(n);
    for frame in SMEAR_RANGE..upper {
        let left = bad[frame - SMEAR_RANGE..=frame].iter().any(|&b| b);
        let right = bad[frame..=(frame + SMEAR_RANGE).min(n - 1)].iter().any(|&b| b);
        smeared[frame] = left && right;
    }

    let mut runs = Vec::new();
    let mut frame = 0;
    while frame < n {
        while frame < n && !smeared[frame] {
            frame += 1;
        }
        if frame >= n {
            break;
        }
        let start = frame;
        while frame < n && smeared[frame] {
            frame += 1;
        }
        if frame < n && frame - start >= MINIMUM_NUMBER_OF_BAD_FRAMES_IN_BAD_INTERVAL {
            if runs.len() >= MAX_NUMBER_OF_BAD_INTERVALS {
                warn!(max = MAX_NUMBER_OF_BAD_INTERVALS, "bad-interval limit reached");
                break;
            }
            runs.push(FrameRun { start, stop: frame });
        }
    }
    runs
}

/// Best lag of `x2` against `x1` within `(-search_range, search_range)`
/// from the cross-correlation of the rectified envelopes.
///
/// Returns `(delay, normalized correlation)`. Either input with mean power
/// at or below `1e-6` yields `(0, 0.0)`.
pub fn compute_delay(fft: &mut FftContext, x1: &[f32], x2: &[f32], search_range: usize) -> (i64, f32) {
    let n = x1.len().min(x2.len());
    if n == 0 {
        return (0, 0.0);
    }
    let nfft = next_pow2(2 * n);
    let scale = n as f64 / nfft as f64;
    let (Ok(p1), Ok(p2)) = (
        power_of(x1, 0, n as i64, n as i64),
        power_of(x2, 0, n as i64, n as i64),
    ) else {
        return (0, 0.0);
    };
    let (p1, p2) = (p1 * scale, p2 * scale);
    if p1 <= 1e-6 || p2 <= 1e-6 {
        return (0, 0.0);
    }
    let normalization = (p1 * p2).sqrt();

    let mut a = vec![0.0f32; nfft + 2];
    let mut b = vec![0.0f32; nfft + 2];
    for i in 0..n {
        a[i] = x1[i].abs();
        b[i] = x2[i].abs();
    }
    fft.real_forward(&mut a, nfft);
    fft.real_forward(&mut b, nfft);

    let inv = 1.0 / nfft as f32;
    for k in 0..=nfft / 2 {
        let (ar, ai) = (a[2 * k] * inv, a[2 * k + 1] * inv);
        let (br, bi) = (b[2 * k], b[2 * k + 1]);
        a[2 * k] = ar * br + ai * bi;
        a[2 * k + 1] = ar * bi - ai * br;
    }
    fft.real_inverse(&mut a, nfft);

    let range = search_range.min(nfft / 2) as i64;
    let mut best = (0i64, 0.0f32);
    for lag in -range..range {
        let idx = lag.rem_euclid(nfft as i64) as usize;
        let h = (a[idx].abs() as f64 / normalization) as f32;
        if h > best.1 {
            best = (lag, h);
        }
    }
    best
}

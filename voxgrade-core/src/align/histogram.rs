//! Delay histograms built from windowed frame cross-correlations.
//!
//! Each frame pair is Hann-windowed, cross-correlated through the FFT and
//! reduced to the lags within 1% of that frame's peak. Those lags vote into
//! a circular histogram of length `N`; index `i` stands for lag `i` when
//! `i < N/2` and `i - N` otherwise.

use crate::{buffering::AlignRegions, buffering::Signal, dsp::FftContext};

/// Correlate one `N`-sample frame of each track.
///
/// On return `x1[..N]` holds `|r[lag]|` and the result is `0.99 * max`.
pub(crate) fn correlate_frame(
    r: &mut AlignRegions<'_>,
    fft: &mut FftContext,
    reference: &Signal,
    degraded: &Signal,
    start_ref: i64,
    start_deg: i64,
) -> f32 {
    let n = r.window.len();
    for i in 0..n {
        let w = r.window[i];
        r.x1[i] = reference.get_or_zero(start_ref + i as i64) * w;
        r.x2[i] = degraded.get_or_zero(start_deg + i as i64) * w;
    }
    fft.real_forward(r.x1, n);
    fft.real_forward(r.x2, n);

    // conj(X1) * X2
    for k in 0..=n / 2 {
        let (re1, im1) = (r.x1[2 * k], -r.x1[2 * k + 1]);
        let (re2, im2) = (r.x2[2 * k], r.x2[2 * k + 1]);
        r.x1[2 * k] = re1 * re2 - im1 * im2;
        r.x1[2 * k + 1] = re1 * im2 + im1 * re2;
    }
    fft.real_inverse(r.x1, n);

    let mut peak = 0.0f32;
    for v in r.x1[..n].iter_mut() {
        *v = v.abs();
        peak = peak.max(*v);
    }
    peak * 0.99
}

/// Add `threshold^0.125` to every histogram bin whose lag beats `threshold`.
pub(crate) fn vote_flat(r: &mut AlignRegions<'_>, threshold: f32) {
    let weight = threshold.powf(0.125);
    let n = r.hist.len();
    for (h, &v) in r.hist.iter_mut().zip(&r.x1[..n]) {
        if v > threshold {
            *h += weight;
        }
    }
}

/// Spread each vote over a triangle of half-width `kernel` bins.
///
/// Returns the total weight added.
pub(crate) fn vote_triangular(r: &mut AlignRegions<'_>, threshold: f32, kernel: usize) -> f32 {
    let n = r.hist.len();
    let k = kernel as i64;
    let weight = threshold.powf(0.125) / kernel as f32;
    let mut added = 0.0f32;
    for i in 0..n {
        if r.x1[i] > threshold {
            added += weight * kernel as f32;
            for off in (1 - k)..k {
                let bin = (i as i64 + off).rem_euclid(n as i64) as usize;
                r.hist[bin] += weight * (k - off.abs()) as f32;
            }
        }
    }
    added
}

/// Circularly convolve the histogram with a triangle of half-width `kernel`
/// and normalize by the pre-smoothing total.
pub(crate) fn smooth_triangular(r: &mut AlignRegions<'_>, fft: &mut FftContext, kernel: usize) {
    let n = r.hist.len();
    let total: f32 = r.hist.iter().sum();

    r.x1[..n].copy_from_slice(&r.hist[..]);
    r.x2.fill(0.0);
    r.x2[0] = 1.0;
    for c in 1..kernel.min(n) {
        let v = 1.0 - c as f32 / kernel as f32;
        r.x2[c] = v;
        r.x2[n - c] = v;
    }

    fft.real_forward(r.x1, n);
    fft.real_forward(r.x2, n);
    for k in 0..=n / 2 {
        let (re1, im1) = (r.x1[2 * k], r.x1[2 * k + 1]);
        let (re2, im2) = (r.x2[2 * k], r.x2[2 * k + 1]);
        r.x1[2 * k] = re1 * re2 - im1 * im2;
        r.x1[2 * k + 1] = re1 * im2 + im1 * re2;
    }
    fft.real_inverse(r.x1, n);

    for (h, &v) in r.hist.iter_mut().zip(&r.x1[..n]) {
        *h = if total > 0.0 { v.abs() / total } else { 0.0 };
    }
}

/// Highest bin as `(signed lag, height)`. An all-zero histogram gives
/// `(0, 0.0)`.
pub(crate) fn peak_lag(hist: &[f32]) -> (i64, f32) {
    let n = hist.len() as i64;
    let mut best = (0i64, 0.0f32);
    for (i, &h) in hist.iter().enumerate() {
        if h > best.1 {
            best = (i as i64, h);
        }
    }
    if best.0 >= n / 2 {
        best.0 -= n;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffering::AlignArena;
    use approx::assert_relative_eq;

    fn noise(len: usize, seed: u64) -> Vec<f32> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f32 / (1u64 << 31) as f32) - 0.5
            })
            .collect()
    }

    #[test]
    fn frame_correlation_finds_lag() {
        let base = noise(4096, 7);
        let lag = 37;
        let mut late = vec![0.0f32; lag];
        late.extend_from_slice(&base);
        let (reference, degraded) = (Signal::from(base), Signal::from(late));

        let mut arena = AlignArena::new(1024);
        let mut fft = FftContext::new();
        let mut r = arena.regions();
        r.hist.fill(0.0);
        let threshold = correlate_frame(&mut r, &mut fft, &reference, &degraded, 1000, 1000);
        vote_flat(&mut r, threshold);
        let (found, _) = peak_lag(&r.hist[..]);
        assert_eq!(found, lag as i64);
    }

    #[test]
    fn peak_lag_wraps_negative() {
        let mut hist = vec![0.0f32; 16];
        hist[14] = 2.0;
        assert_eq!(peak_lag(&hist), (-2, 2.0));
        assert_eq!(peak_lag(&[0.0; 8]), (0, 0.0));
    }

    #[test]
    fn triangular_vote_wraps_and_sums() {
        let mut arena = AlignArena::new(64);
        let mut r = arena.regions();
        r.hist.fill(0.0);
        r.x1.fill(0.0);
        r.x1[0] = 1.0;
        let added = vote_triangular(&mut r, 0.5, 4);
        assert_relative_eq!(added, 0.5f32.powf(0.125));
        assert!(r.hist[63] > 0.0 && r.hist[1] > 0.0);
        assert_relative_eq!(r.hist[63], r.hist[1]);
        assert!(r.hist[0] > r.hist[1]);
        assert_eq!(r.hist[4], 0.0);
    }

    #[test]
    fn smoothing_keeps_single_peak_in_place() {
        let mut arena = AlignArena::new(256);
        let mut fft = FftContext::new();
        let mut r = arena.regions();
        r.hist.fill(0.0);
        r.hist[250] = 3.0;
        smooth_triangular(&mut r, &mut fft, 4);
        let (lag, height) = peak_lag(&r.hist[..]);
        assert_eq!(lag, -6);
        assert_relative_eq!(height, 1.0, epsilon = 1e-4);
    }
}

//! Transform engine: packed real FFT, inverse, and linear cross-correlation.
//!
//! ## Packing
//!
//! A forward transform of `N` real samples yields `N/2 + 1` complex bins
//! (the rest follow from Hermitian symmetry). They are stored interleaved,
//! `[re0, im0, re1, im1, ..., re(N/2), im(N/2)]`, so every buffer handed to
//! [`FftContext::real_forward`] must hold at least `N + 2` floats.
//!
//! ## Cache
//!
//! `FftContext` keeps one planned forward/inverse pair plus a complex work
//! buffer for the most recent `N`. Asking for a different `N` replans.

use std::sync::Arc;

use rustfft::{num_complex::Complex32, Fft, FftPlanner};

/// Smallest power of two `>= x` (and `1` for `x <= 1`).
pub fn next_pow2(x: usize) -> usize {
    x.max(1).next_power_of_two()
}

struct Plan {
    len: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    work: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

/// Reusable transform state. Not `Sync`; one per rating call.
pub struct FftContext {
    planner: FftPlanner<f32>,
    plan: Option<Plan>,
}

impl FftContext {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            plan: None,
        }
    }

    fn plan_for(&mut self, n: usize) -> &mut Plan {
        debug_assert!(n.is_power_of_two(), "FFT length {n} is not a power of two");
        let plan = match self.plan.take() {
            Some(plan) if plan.len == n => plan,
            _ => {
                let forward = self.planner.plan_fft_forward(n);
                let inverse = self.planner.plan_fft_inverse(n);
                let scratch_len = forward
                    .get_inplace_scratch_len()
                    .max(inverse.get_inplace_scratch_len());
                Plan {
                    len: n,
                    forward,
                    inverse,
                    work: vec![Complex32::new(0.0, 0.0); n],
                    scratch: vec![Complex32::new(0.0, 0.0); scratch_len],
                }
            }
        };
        self.plan.insert(plan)
    }

    /// Forward transform of `buffer[..n]`, written back as `n/2 + 1`
    /// interleaved bins into `buffer[..n + 2]`.
    pub fn real_forward(&mut self, buffer: &mut [f32], n: usize) {
        if n <= 1 {
            return;
        }
        let plan = self.plan_for(n);
        for (slot, &x) in plan.work.iter_mut().zip(&buffer[..n]) {
            *slot = Complex32::new(x, 0.0);
        }
        plan.forward
            .process_with_scratch(&mut plan.work, &mut plan.scratch);
        for (k, bin) in plan.work[..=n / 2].iter().enumerate() {
            buffer[2 * k] = bin.re;
            buffer[2 * k + 1] = bin.im;
        }
    }

    /// Inverse of [`real_forward`](Self::real_forward): reads `n/2 + 1`
    /// interleaved bins, rebuilds the upper half by conjugate symmetry and
    /// writes `n` real samples (scaled by `1/n`) into `buffer[..n]`.
    pub fn real_inverse(&mut self, buffer: &mut [f32], n: usize) {
        if n <= 1 {
            return;
        }
        let plan = self.plan_for(n);
        for k in 0..=n / 2 {
            plan.work[k] = Complex32::new(buffer[2 * k], buffer[2 * k + 1]);
        }
        for k in n / 2 + 1..n {
            plan.work[k] = plan.work[n - k].conj();
        }
        plan.inverse
            .process_with_scratch(&mut plan.work, &mut plan.scratch);
        let scale = 1.0 / n as f32;
        for (out, bin) in buffer[..n].iter_mut().zip(&plan.work) {
            *out = bin.re * scale;
        }
    }

    /// Linear cross-correlation of `x1` against `x2`.
    ///
    /// Returns `x1.len() + x2.len() - 1` values; index `k` holds
    /// `sum_i x1[i] * x2[i + k - (x1.len() - 1)]`, so zero lag sits at
    /// `x1.len() - 1` and positive lags mean `x2` is late.
    pub fn correlate(&mut self, x1: &[f32], x2: &[f32]) -> Vec<f32> {
        let (n1, n2) = (x1.len(), x2.len());
        if n1 == 0 || n2 == 0 {
            return Vec::new();
        }
        let ny = n1 + n2 - 1;
        let n = next_pow2(n1 + n2);

        let mut a = vec![0.0f32; n + 2];
        let mut b = vec![0.0f32; n + 2];
        a[..n1].copy_from_slice(x1);
        b[..n2].copy_from_slice(x2);
        self.real_forward(&mut a, n);
        self.real_forward(&mut b, n);

        // conj(A) * B
        for k in 0..=n / 2 {
            let (ar, ai) = (a[2 * k], -a[2 * k + 1]);
            let (br, bi) = (b[2 * k], b[2 * k + 1]);
            a[2 * k] = ar * br - ai * bi;
            a[2 * k + 1] = ar * bi + ai * br;
        }
        self.real_inverse(&mut a, n);

        // circular lag l lives at a[l mod n]; unwrap into linear order
        (0..ny)
            .map(|k| {
                let lag = k as i64 - (n1 as i64 - 1);
                a[lag.rem_euclid(n as i64) as usize]
            })
            .collect()
    }
}

impl Default for FftContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FftContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftContext")
            .field("len", &self.plan.as_ref().map(|p| p.len))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn next_pow2_is_monotone() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(5), 8);
        assert_eq!(next_pow2(1024), 1024);
        let mut last = 0;
        for x in 0..3000 {
            let p = next_pow2(x);
            assert!(p >= last && p >= x);
            last = p;
        }
    }

    #[test]
    fn round_trip_restores_input() {
        let n = 1024;
        let input: Vec<f32> = (0..n)
            .map(|i| ((i as f32) * 0.37).sin() + 0.25 * ((i as f32) * 1.9).cos())
            .collect();
        let mut buf = vec![0.0f32; n + 2];
        buf[..n].copy_from_slice(&input);

        let mut ctx = FftContext::new();
        ctx.real_forward(&mut buf, n);
        ctx.real_inverse(&mut buf, n);

        for (a, b) in buf[..n].iter().zip(&input) {
            assert_relative_eq!(*a, *b, epsilon = 1e-4, max_relative = 1e-4);
        }
    }

    #[test]
    fn forward_of_constant_is_dc_only() {
        let n = 16;
        let mut buf = vec![1.0f32; n + 2];
        let mut ctx = FftContext::new();
        ctx.real_forward(&mut buf, n);
        assert_relative_eq!(buf[0], n as f32, epsilon = 1e-4);
        for v in &buf[2..] {
            assert!(v.abs() < 1e-4);
        }
    }

    #[test]
    fn length_one_is_noop() {
        let mut buf = vec![3.0f32, 0.0, 0.0];
        let mut ctx = FftContext::new();
        ctx.real_forward(&mut buf, 1);
        ctx.real_inverse(&mut buf, 1);
        assert_eq!(buf[0], 3.0);
    }

    #[test]
    fn cache_rebuilds_on_length_change() {
        let mut ctx = FftContext::new();
        for &n in &[64usize, 256, 64] {
            let mut buf = vec![0.0f32; n + 2];
            buf[1] = 1.0;
            ctx.real_forward(&mut buf, n);
            ctx.real_inverse(&mut buf, n);
            assert_relative_eq!(buf[1], 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn self_correlation_peaks_at_zero_lag() {
        let x: Vec<f32> = (0..300).map(|i| ((i * 7919) % 97) as f32 - 48.0).collect();
        let mut ctx = FftContext::new();
        let y = ctx.correlate(&x, &x);
        assert_eq!(y.len(), 2 * x.len() - 1);
        let peak = y
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(x.len() - 1));
    }

    #[test]
    fn correlation_finds_shift() {
        let base: Vec<f32> = (0..200).map(|i| ((i * 31) % 17) as f32 - 8.0).collect();
        let mut late = vec![0.0f32; 12];
        late.extend_from_slice(&base);
        let mut ctx = FftContext::new();
        let y = ctx.correlate(&base, &late);
        let peak = y
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i as i64 - (base.len() as i64 - 1));
        assert_eq!(peak, Some(12));
    }
}

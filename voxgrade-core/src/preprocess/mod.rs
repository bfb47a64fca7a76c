//! Level and band conditioning applied before alignment.
//!
//! Every stage leaves the guard region (`SEARCHBUFFER * DOWNSAMPLE` samples
//! at each edge) alone except the IIR bank, which runs over the whole buffer.

pub mod curves;

use tracing::{debug, warn};

use crate::{
    buffering::Signal,
    dsp::{apply_sos_cascade, next_pow2, FftContext},
    engine::SignalInfo,
    error::{RatingError, Result},
    params::{ModelParams, TARGET_AVG_POWER},
};

pub use curves::{ResponseCurve, ALIGN_FILTER, IRS_FILTER};

/// Remove the DC offset of the interior `[guard, size - guard)` and fade the
/// first and last `DOWNSAMPLE` interior samples in and out.
pub fn dc_block(data: &mut Signal, size: usize, params: &ModelParams) {
    let guard = params.guard();
    let ds = params.downsample;
    let size = size.min(data.len());
    if size <= 2 * guard {
        return;
    }
    let interior = &mut data.as_mut_slice()[guard..size - guard];

    let mean = (interior.iter().map(|&x| x as f64).sum::<f64>() / interior.len() as f64) as f32;
    for x in interior.iter_mut() {
        *x -= mean;
    }

    let ramp = ds.min(interior.len());
    for k in 0..ramp {
        let gain = (0.5 + k as f32) / ds as f32;
        interior[k] *= gain;
        let tail = interior.len() - 1 - k;
        interior[tail] *= gain;
    }
}

/// Run the fixed input IIR bank over the whole buffer.
pub fn apply_filter_bank(data: &mut Signal, params: &ModelParams) {
    apply_sos_cascade(data.as_mut_slice(), params.input_iir);
}

/// DC removal followed by the input IIR bank.
pub fn input_filter(info: &mut SignalInfo, params: &ModelParams) {
    dc_block(&mut info.data, info.n_samples, params);
    apply_filter_bank(&mut info.data, params);
}

/// Shape the interior of `data` with `curve`, normalized to unity at 1 kHz.
///
/// ## Algorithm
///
/// 1. Copy the guard-trimmed interior into a zero-padded power-of-two frame.
/// 2. Forward FFT; scale bin `i` (frequency `i * rate / N`) by
///    `10^((curve(f) - curve(1000)) / 20)`.
/// 3. Inverse FFT and write the first `n` samples back.
pub fn apply_curve_filter(
    data: &mut Signal,
    curve: &ResponseCurve,
    params: &ModelParams,
    fft: &mut FftContext,
) {
    let guard = params.guard();
    if data.len() <= 2 * guard {
        return;
    }
    let n = data.len() - 2 * guard;
    let nfft = next_pow2(n);

    let mut x = vec![0.0f32; nfft + 2];
    x[..n].copy_from_slice(&data.as_slice()[guard..guard + n]);
    fft.real_forward(&mut x, nfft);

    let resolution = params.sample_rate as f64 / nfft as f64;
    for i in 0..=nfft / 2 {
        let gain = curve.relative_gain(i as f64 * resolution);
        x[2 * i] *= gain;
        x[2 * i + 1] *= gain;
    }

    fft.real_inverse(&mut x, nfft);
    data.as_mut_slice()[guard..guard + n].copy_from_slice(&x[..n]);
}

/// Sum of squares over `[start, stop)` divided by `divisor`.
///
/// # Errors
/// `InternalInconsistency` when the interval is negative, inverted or runs
/// past the end of `x`.
pub fn power_of(x: &[f32], start: i64, stop: i64, divisor: i64) -> Result<f64> {
    if start < 0 || start > stop || stop as usize > x.len() {
        return Err(RatingError::InternalInconsistency(format!(
            "power interval [{start}, {stop}) invalid for {} samples",
            x.len()
        )));
    }
    let sum: f64 = x[start as usize..stop as usize]
        .iter()
        .map(|&v| (v as f64) * (v as f64))
        .sum();
    Ok(sum / divisor as f64)
}

/// Scale `info` so its band-limited mean power is `TARGET_AVG_POWER`.
///
/// Power is measured on an align-filtered copy over
/// `[guard, n_samples - guard + padding)` and divided by the interior length
/// of the *longer* track so both tracks share one denominator. The scale is
/// applied to the unfiltered samples.
pub fn normalize_level(
    info: &mut SignalInfo,
    max_n_samples: usize,
    params: &ModelParams,
    fft: &mut FftContext,
) -> Result<()> {
    let guard = params.guard() as i64;
    let pad = params.padding() as i64;
    let n = info.n_samples as i64;

    let mut filtered = info.data.clone();
    apply_curve_filter(&mut filtered, &ALIGN_FILTER, params, fft);

    let divisor = max_n_samples as i64 - 2 * guard + pad;
    let power = power_of(filtered.as_slice(), guard, n - guard + pad, divisor)?;

    if power <= 0.0 {
        warn!(n_samples = info.n_samples, "zero in-band power, level left unchanged");
        return Ok(());
    }

    let scale = (TARGET_AVG_POWER / power).sqrt() as f32;
    debug!(power, scale, "level normalized");
    for x in &mut info.data.as_mut_slice()[..info.n_samples] {
        *x *= scale;
    }
    Ok(())
}

//! Perceptual model: from aligned tracks to the raw quality score.
//!
//! ## Algorithm
//!
//! 1. Trim leading/trailing reference silence (5-sample windows whose
//!    absolute sum stays under `CRITERIUM_FOR_SILENCE_OF_5_SAMPLES`).
//! 2. For every half-overlapping frame of `Nf = 8 * DOWNSAMPLE` samples,
//!    take the Bark power density of the reference and of the degraded
//!    track shifted by the delay of the piece the frame starts in.
//! 3. Level-equalize and compute the symmetric (`D`) and asymmetric (`A`)
//!    disturbance per frame ([`disturbance`]).
//! 4. Zero the frames the degraded track skipped over at backward delay
//!    jumps.
//! 5. Re-align bad intervals locally and keep the smaller disturbance
//!    ([`bad_interval`]).
//! 6. Normalize by reference level, pool over syllables and time
//!    ([`pooling`]) and map to `4.5 - 0.1 * D - 0.0309 * A`.

pub mod bad_interval;
pub mod bark;
pub mod disturbance;
pub mod pooling;

use ndarray::Array2;
use tracing::debug;

use crate::{
    buffering::Signal,
    engine::{Piece, RatingContext},
    error::{RatingError, Result},
    params::{
        A_POW_S, A_POW_T, A_WEIGHT, CRITERIUM_FOR_SILENCE_OF_5_SAMPLES, D_POW_S, D_POW_T,
        D_WEIGHT, SEARCH_RANGE_IN_TRANSFORM_LENGTH, THRESHOLD_BAD_FRAMES,
    },
};

use self::{
    bad_interval::{compute_delay, find_bad_intervals},
    bark::{freq_warping, time_avg_audible, total_audible, FrameAnalyzer},
    disturbance::DisturbanceModel,
    pooling::{lpq_weight, normalize_by_level, time_weights},
};

/// Indicators and raw score of one rating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOutput {
    pub d_indicator: f32,
    pub a_indicator: f32,
    /// `4.5 - D_WEIGHT * d - A_WEIGHT * a`, unclamped.
    pub raw_score: f32,
}

/// Delay of the last piece starting at or before sample `pos`, falling back
/// to the first piece.
fn delay_at(pieces: &[Piece], pos: i64, ds: i64) -> i64 {
    pieces
        .iter()
        .rev()
        .find(|p| p.start * ds <= pos)
        .or_else(|| pieces.first())
        .map_or(0, |p| p.delay)
}

/// Count samples of 5-sample silence stepping from `from` in direction
/// `step`, up to `limit`.
fn silent_run(data: &Signal, from: i64, step: i64, limit: i64) -> i64 {
    let mut skip = 0;
    loop {
        let sum: f32 = (0..5)
            .map(|i| data.get_or_zero(from + step * (skip + i)).abs())
            .sum();
        if sum >= CRITERIUM_FOR_SILENCE_OF_5_SAMPLES {
            break;
        }
        skip += 1;
        if skip >= limit {
            break;
        }
    }
    skip
}

/// Run the model on aligned tracks.
///
/// # Errors
/// `InternalInconsistency` when alignment produced no pieces.
pub fn perceptual_model(ctx: &mut RatingContext) -> Result<ModelOutput> {
    if ctx.pieces.is_empty() {
        return Err(RatingError::InternalInconsistency(
            "no aligned speech pieces".into(),
        ));
    }

    let params = ctx.params;
    let bark = params.bark;
    let ds = params.downsample as i64;
    let guard = params.guard() as i64;
    let pad = params.padding() as i64;
    let nf = params.frame_len() as i64;
    let hop = nf / 2;
    let max_n = ctx.max_n_samples() as i64;

    let skip_start = silent_run(&ctx.src.data, guard, 1, max_n / 2);
    let skip_end = silent_run(&ctx.src.data, max_n - guard + pad - 1, -1, max_n / 2);
    let start_frame = (skip_start / hop) as usize;
    let stop_frame = (max_n - 2 * guard + pad - skip_end) / hop - 1;
    if stop_frame < 0 {
        debug!(stop_frame, "no frames to score");
        return Ok(score(0.0, 0.0));
    }
    let stop_frame = stop_frame as usize;
    let n_frames = stop_frame + 1;

    let mut analyzer = FrameAnalyzer::new(nf as usize);
    let mut ref_dens = Array2::<f32>::zeros((n_frames, bark.bands()));
    let mut deg_dens = Array2::<f32>::zeros((n_frames, bark.bands()));
    let mut silent = vec![false; n_frames];

    for frame in 0..n_frames {
        let start_ref = guard + frame as i64 * hop;
        let spectrum = analyzer.short_term_spectrum(&mut ctx.fft, &ctx.src.data, start_ref);
        freq_warping(spectrum, bark, ref_dens.row_mut(frame));

        let start_deg = start_ref + delay_at(&ctx.pieces, start_ref, ds);
        let spectrum = if start_deg > 0 && start_deg + nf < max_n + pad {
            analyzer.short_term_spectrum(&mut ctx.fft, &ctx.rec.data, start_deg)
        } else {
            analyzer.silence()
        };
        freq_warping(spectrum, bark, deg_dens.row_mut(frame));

        silent[frame] = total_audible(ref_dens.row(frame), bark, 100.0) < 1e7;
    }

    let frames_in_signal = (max_n - 2 * guard + pad) / hop - 1;
    let avg_ref = time_avg_audible(&ref_dens, &silent, bark, frames_in_signal);
    let avg_deg = time_avg_audible(&deg_dens, &silent, bark, frames_in_signal);
    debug!(
        ref_power = avg_ref.iter().sum::<f32>(),
        deg_power = avg_deg.iter().sum::<f32>(),
        silent_frames = silent.iter().filter(|&&s| s).count(),
        "long-term audible power"
    );

    let mut model = DisturbanceModel::new(bark);
    let mut total_power_ref = vec![0.0f32; n_frames];
    let mut dist = vec![0.0f32; n_frames];
    let mut asym = vec![0.0f32; n_frames];
    for frame in 0..n_frames {
        let out = model.process(frame, ref_dens.row(frame), deg_dens.row_mut(frame));
        total_power_ref[frame] = out.ref_audible;
        dist[frame] = out.symmetric;
        asym[frame] = out.asymmetric;
    }

    skip_jumped_frames(&ctx.pieces, ds, guard, hop, stop_frame, &mut dist, &mut asym);

    if dist.iter().any(|&d| d > THRESHOLD_BAD_FRAMES) {
        let tweaked = piecewise_aligned_degraded(ctx, max_n + pad);
        let runs = find_bad_intervals(&dist, stop_frame);
        debug!(intervals = runs.len(), "bad intervals");

        if !runs.is_empty() {
            let search = SEARCH_RANGE_IN_TRANSFORM_LENGTH as i64 * nf;
            let mut doubly = tweaked.clone();
            let mut spans = Vec::with_capacity(runs.len());

            for run in &runs {
                let start = run.start as i64 * hop + guard;
                let stop = run.stop as i64 * hop + nf + guard;
                let len = (stop - start) as usize;

                let mut reference = vec![0.0f32; len + 2 * search as usize];
                for (i, slot) in reference[search as usize..search as usize + len].iter_mut().enumerate() {
                    *slot = ctx.src.data.get_or_zero(start + i as i64);
                }
                let hi = (max_n - guard + pad - 1).max(guard);
                let degraded: Vec<f32> = (0..reference.len() as i64)
                    .map(|i| tweaked.get_or_zero((start - search + i).clamp(guard, hi)))
                    .collect();

                let (mut delay, corr) = compute_delay(&mut ctx.fft, &reference, &degraded, search as usize);
                if corr < 0.5 {
                    delay = 0;
                }
                for i in start..stop {
                    if let Ok(idx) = usize::try_from(i) {
                        if idx < doubly.len() {
                            doubly[idx] = tweaked.get_or_zero((i + delay).clamp(0, max_n - 1));
                        }
                    }
                }
                spans.push((run.start, run.stop.min(stop_frame)));
            }

            for &(sf, ef) in &spans {
                for frame in sf..ef {
                    let start = guard + frame as i64 * hop;
                    let spectrum = analyzer.short_term_spectrum(&mut ctx.fft, &doubly, start);
                    freq_warping(spectrum, bark, deg_dens.row_mut(frame));
                }
                model.reset();
                for frame in sf..ef {
                    let out = model.process(frame, ref_dens.row(frame), deg_dens.row_mut(frame));
                    dist[frame] = dist[frame].min(out.symmetric);
                    asym[frame] = asym[frame].min(out.asymmetric);
                }
            }
        }
    }

    let weights = time_weights(n_frames, (max_n - 2 * guard) / hop - 1);
    normalize_by_level(&mut dist, &mut asym, &total_power_ref);

    let d_indicator = lpq_weight(start_frame, stop_frame, D_POW_S, D_POW_T, &dist, &weights);
    let a_indicator = lpq_weight(start_frame, stop_frame, A_POW_S, A_POW_T, &asym, &weights);
    debug!(d_indicator, a_indicator, frames = n_frames, "disturbance pooled");
    Ok(score(d_indicator, a_indicator))
}

fn score(d_indicator: f32, a_indicator: f32) -> ModelOutput {
    ModelOutput {
        d_indicator,
        a_indicator,
        raw_score: (4.5 - D_WEIGHT * d_indicator as f64 - A_WEIGHT * a_indicator as f64) as f32,
    }
}

/// Zero the disturbance of frames the degraded track jumped back over.
///
/// When the delay drops by more than a hop between neighbouring pieces, the
/// degraded track replays audio; those frames are not scored.
fn skip_jumped_frames(
    pieces: &[Piece],
    ds: i64,
    guard: i64,
    hop: i64,
    stop_frame: usize,
    dist: &mut [f32],
    asym: &mut [f32],
) {
    for pair in pieces.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let frame1 = (cur.start * ds - guard + cur.delay).div_euclid(hop);
        let limit = (prev.end * ds - guard + prev.delay).div_euclid(hop);
        let frame1 = frame1.min(limit).max(0);

        let jump = cur.delay - prev.delay;
        if jump < -hop {
            let frame2 = (cur.start * ds - guard + jump.abs()) / hop + 1;
            for frame in frame1..=frame2 {
                if let Ok(f) = usize::try_from(frame) {
                    if f < stop_frame {
                        dist[f] = 0.0;
                        asym[f] = 0.0;
                    }
                }
            }
        }
    }
}

/// The degraded track with every sample pulled through its piece's delay,
/// clamped to the interior.
fn piecewise_aligned_degraded(ctx: &RatingContext, len: i64) -> Signal {
    let ds = ctx.params.downsample as i64;
    let guard = ctx.params.guard() as i64;
    let mut out = Signal::zeros(len.max(0) as usize);
    let hi = len - guard - 1;
    for i in guard..len - guard {
        let j = (i + delay_at(&ctx.pieces, i, ds)).clamp(guard, hi.max(guard));
        out[i as usize] = ctx.rec.data.get_or_zero(j);
    }
    out
}

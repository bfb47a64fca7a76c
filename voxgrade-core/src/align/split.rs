//! Delay-jump detection inside one piece.
//!
//! ## Algorithm
//!
//! 1. Lay breakpoint candidates across the piece's speech interior, `step`
//!    windows apart (at most [`MAX_SPLIT_CANDIDATES`]).
//! 2. For every candidate, crude-align the halves `[start, bp)` and
//!    `[bp, end)` on their own to get estimates `ED1` and `ED2`.
//! 3. Forward sweep: triangular-vote histograms from the piece start, one
//!    histogram per distinct `ED1`, read out at each candidate that shares
//!    it. This gives `D1`/`DC1` (delay and confidence before the break).
//! 4. Backward sweep from the piece end for candidates whose `DC1` beats the
//!    piece confidence. This gives `D2`/`DC2`.
//! 5. Keep the candidate with the largest `DC1 + DC2` whose delays differ by
//!    at least one window and whose confidences both beat the piece's.

use tracing::debug;

use super::{
    crude_align,
    histogram::{correlate_frame, peak_lag, vote_triangular},
    CrudeTarget,
};
use crate::{
    engine::{Piece, RatingContext},
    params::MAX_SPLIT_CANDIDATES,
};

/// Confidence marker for "not yet measured".
const UNMEASURED: f32 = -2.0;

/// The piece to probe, in VAD windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRequest {
    pub start: i64,
    pub speech_start: i64,
    pub speech_end: i64,
    pub end: i64,
    pub delay_est: i64,
    /// Confidence of the unsplit piece; both halves must beat it.
    pub confidence: f32,
}

impl SplitRequest {
    pub fn for_piece(piece: &Piece, speech_start: i64, speech_end: i64) -> Self {
        Self {
            start: piece.start,
            speech_start,
            speech_end,
            end: piece.end,
            delay_est: piece.delay_est,
            confidence: piece.confidence,
        }
    }
}

/// Best breakpoint with the delays on either side of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitResult {
    pub est1: i64,
    pub delay1: i64,
    pub conf1: f32,
    pub est2: i64,
    pub delay2: i64,
    pub conf2: f32,
    /// VAD window of the break.
    pub breakpoint: i64,
}

/// Breakpoint candidates for a speech interior of `[speech_start, speech_end)`.
///
/// The first candidate is always emitted; later ones stay at least `pad`
/// windows clear of the speech end.
pub(crate) fn breakpoints(speech_start: i64, speech_end: i64, delta: i64) -> Vec<i64> {
    let len = speech_end - speech_start;
    let span = (40 * delta) as f64;
    let step = ((0.801 * len as f64 + span - 1.0) / span) as i64 * delta;
    let pad = (len / 10).max(75);

    let mut bps = vec![speech_start + pad];
    while bps.len() < MAX_SPLIT_CANDIDATES {
        let next = bps[bps.len() - 1] + step;
        if next > speech_end - pad {
            break;
        }
        bps.push(next);
    }
    bps
}

/// Search piece `req` for a delay jump. `None` when no candidate passes.
///
/// Uses `ctx.probe` as scratch for the per-candidate crude alignments.
pub fn split_align(ctx: &mut RatingContext, req: &SplitRequest) -> Option<SplitResult> {
    let ds = ctx.params.downsample as i64;
    let nfft = ctx.params.align_nfft as i64;
    let hop = nfft / 4;
    let kernel = ctx.params.align_nfft / 64;
    let rec_n = ctx.rec.n_samples as i64;

    let bps = breakpoints(req.speech_start, req.speech_end, nfft / (4 * ds));
    let n = bps.len();

    let mut ed1 = vec![0i64; n];
    let mut ed2 = vec![0i64; n];
    for (i, &bp) in bps.iter().enumerate() {
        ctx.probe = Piece {
            delay_est: req.delay_est,
            search_start: req.start,
            search_end: bp,
            ..Piece::default()
        };
        crude_align(ctx, CrudeTarget::Probe);
        ed1[i] = ctx.probe.delay;

        ctx.probe = Piece {
            delay_est: req.delay_est,
            search_start: bp,
            search_end: req.end,
            ..Piece::default()
        };
        crude_align(ctx, CrudeTarget::Probe);
        ed2[i] = ctx.probe.delay;
    }

    let mut r = ctx.arena.regions();

    let mut d1 = vec![0i64; n];
    let mut dc1 = vec![UNMEASURED; n];
    while let Some(first) = dc1.iter().position(|&c| c <= UNMEASURED) {
        let est = ed1[first];
        r.hist.fill(0.0);
        let mut hsum = 0.0f32;

        let mut startr = req.start * ds;
        let mut startd = startr + est;
        if startd < 0 {
            startr = -est;
            startd = 0;
        }

        for bp in first..n {
            if bp != first && (ed1[bp] != est || dc1[bp] > UNMEASURED) {
                continue;
            }
            while startd + nfft <= rec_n && startr + nfft <= bps[bp] * ds {
                let threshold = correlate_frame(
                    &mut r,
                    &mut ctx.fft,
                    &ctx.src.data,
                    &ctx.rec.data,
                    startr,
                    startd,
                );
                hsum += vote_triangular(&mut r, threshold, kernel);
                startr += hop;
                startd += hop;
            }
            let (lag, height) = peak_lag(&r.hist[..]);
            d1[bp] = est + lag;
            dc1[bp] = if hsum > 0.0 { height / hsum } else { 0.0 };
        }
    }

    let mut d2 = vec![0i64; n];
    let mut dc2: Vec<f32> = dc1
        .iter()
        .map(|&c| if c > req.confidence { UNMEASURED } else { 0.0 })
        .collect();
    while let Some(last) = dc2.iter().rposition(|&c| c <= UNMEASURED) {
        let est = ed2[last];
        r.hist.fill(0.0);
        let mut hsum = 0.0f32;

        let mut startr = req.end * ds - nfft;
        let mut startd = startr + est;
        if startd + nfft > rec_n {
            startd = rec_n - nfft;
            startr = startd - est;
        }

        for bp in (0..=last).rev() {
            if bp != last && (ed2[bp] != est || dc2[bp] > UNMEASURED) {
                continue;
            }
            while startd >= 0 && startr >= bps[bp] * ds {
                let threshold = correlate_frame(
                    &mut r,
                    &mut ctx.fft,
                    &ctx.src.data,
                    &ctx.rec.data,
                    startr,
                    startd,
                );
                hsum += vote_triangular(&mut r, threshold, kernel);
                startr -= hop;
                startd -= hop;
            }
            let (lag, height) = peak_lag(&r.hist[..]);
            d2[bp] = est + lag;
            dc2[bp] = if hsum > 0.0 { height / hsum } else { 0.0 };
        }
    }

    let mut best = None;
    let mut best_sum = 0.0f32;
    for bp in 0..n {
        let sum = dc1[bp] + dc2[bp];
        if (d2[bp] - d1[bp]).abs() >= ds
            && sum > best_sum
            && dc1[bp] > req.confidence
            && dc2[bp] > req.confidence
        {
            best_sum = sum;
            best = Some(SplitResult {
                est1: ed1[bp],
                delay1: d1[bp],
                conf1: dc1[bp],
                est2: ed2[bp],
                delay2: d2[bp],
                conf2: dc2[bp],
                breakpoint: bps[bp],
            });
        }
    }

    if let Some(found) = &best {
        debug!(
            breakpoint = found.breakpoint,
            delay1 = found.delay1,
            delay2 = found.delay2,
            "delay jump found"
        );
    }
    best
}

//! Delay estimation between the reference and degraded tracks.
//!
//! ## Stages
//!
//! - [`crude_align`]: correlate the log-VAD tracks (window resolution).
//! - [`time_align`]: refine one piece to sample resolution with a
//!   whitened cross-correlation histogram.
//! - [`split::split_align`]: look for a delay jump inside one piece.

mod histogram;
pub mod split;

use tracing::debug;

use crate::engine::RatingContext;

pub use split::{split_align, SplitRequest, SplitResult};

/// What [`crude_align`] correlates and where it stores the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudeTarget {
    /// Both full tracks; sets `ctx.crude_delay`.
    WholeSignal,
    /// One piece's search window shifted by the global delay; sets the
    /// piece's `delay_est`.
    Piece(usize),
    /// The probe slot's search window shifted by its own `delay_est`; sets
    /// `ctx.probe.delay`.
    Probe,
}

/// Coarse delay from the peak of the log-VAD cross-correlation.
pub fn crude_align(ctx: &mut RatingContext, target: CrudeTarget) {
    let ds = ctx.params.downsample as i64;
    let src_windows = ctx.src.vad_len() as i64;
    let rec_windows = ctx.rec.vad_len() as i64;

    let (startr, startd, nr, nd) = match target {
        CrudeTarget::WholeSignal => (0, 0, src_windows, rec_windows),
        CrudeTarget::Piece(idx) => {
            let p = &ctx.pieces[idx];
            shifted_window(p.search_start, p.search_end, ctx.crude_delay, ds, rec_windows)
        }
        CrudeTarget::Probe => {
            let p = &ctx.probe;
            shifted_window(p.search_start, p.search_end, p.delay_est, ds, rec_windows)
        }
    };
    let nr = nr.min(src_windows - startr);

    let mut i_max = nr - 1;
    if nr > 1 && nd > 1 {
        let x1 = &ctx.src.log_vad()[startr as usize..(startr + nr) as usize];
        let x2 = &ctx.rec.log_vad()[startd as usize..(startd + nd) as usize];
        let y = ctx.fft.correlate(x1, x2);
        let mut best = 0.0f32;
        for (k, &v) in y.iter().enumerate() {
            if v > best {
                best = v;
                i_max = k as i64;
            }
        }
    }
    let lag = (i_max - nr + 1) * ds;

    match target {
        CrudeTarget::WholeSignal => {
            ctx.crude_delay = lag;
            debug!(crude_delay = lag, "whole-signal crude alignment");
        }
        CrudeTarget::Piece(idx) => {
            ctx.pieces[idx].delay_est = lag + ctx.crude_delay;
        }
        CrudeTarget::Probe => {
            ctx.probe.delay = lag + ctx.probe.delay_est;
        }
    }
}

/// Reference/degraded window bounds (in VAD windows) for a search window
/// shifted by `delay` samples.
fn shifted_window(
    search_start: i64,
    search_end: i64,
    delay: i64,
    ds: i64,
    rec_windows: i64,
) -> (i64, i64, i64, i64) {
    let mut startr = search_start;
    let mut startd = startr + delay / ds;
    if startd < 0 {
        startr = -delay / ds;
        startd = 0;
    }
    let nr = search_end - startr;
    let mut nd = nr;
    if startd + nd > rec_windows {
        nd = rec_windows - startd;
    }
    (startr, startd, nr, nd)
}

/// Refine piece `idx` to sample resolution.
///
/// ## Algorithm
///
/// Slide an `Align_Nfft` Hann frame with hop `N/4` over the piece's search
/// window on both tracks (degraded offset by `delay_est`). Every lag within
/// 1% of a frame's correlation peak votes `peak^0.125` into a histogram.
/// The histogram is smoothed with a triangle of half-width `N/64` and
/// normalized; its peak gives the refinement and the confidence.
pub fn time_align(ctx: &mut RatingContext, idx: usize) {
    let nfft = ctx.params.align_nfft as i64;
    let ds = ctx.params.downsample as i64;
    let rec_n = ctx.rec.n_samples as i64;
    let piece = ctx.pieces[idx];
    let est = piece.delay_est;

    let mut startr = piece.search_start * ds;
    let mut startd = startr + est;
    if startd < 0 {
        startr = -est;
        startd = 0;
    }

    let mut r = ctx.arena.regions();
    r.hist.fill(0.0);
    while startd + nfft <= rec_n && startr + nfft <= piece.search_end * ds {
        let threshold = histogram::correlate_frame(
            &mut r,
            &mut ctx.fft,
            &ctx.src.data,
            &ctx.rec.data,
            startr,
            startd,
        );
        histogram::vote_flat(&mut r, threshold);
        startr += nfft / 4;
        startd += nfft / 4;
    }

    histogram::smooth_triangular(&mut r, &mut ctx.fft, ctx.params.align_nfft / 64);
    let (lag, confidence) = histogram::peak_lag(&r.hist[..]);

    let piece = &mut ctx.pieces[idx];
    piece.delay = est + lag;
    piece.confidence = confidence;
    debug!(
        piece = idx,
        delay = piece.delay,
        confidence,
        "piece time-aligned"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::Piece,
        params::{Bandwidth, ModelParams},
    };

    fn ctx_with_tracks(src: Vec<f32>, rec: Vec<f32>) -> RatingContext {
        let p = ModelParams::for_bandwidth(Bandwidth::Wideband);
        let ds = p.downsample;
        let mut ctx = RatingContext::new(p, vec![0.0; src.len() * ds], vec![0.0; rec.len() * ds]);
        ctx.src.activity.log_vad = src;
        ctx.rec.activity.log_vad = rec;
        ctx
    }

    fn bump(len: usize, at: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; len];
        for (i, x) in v.iter_mut().enumerate().skip(at).take(20) {
            *x = 1.0 + (i - at) as f32 * 0.1;
        }
        v
    }

    #[test]
    fn whole_signal_delay_in_windows() {
        let mut ctx = ctx_with_tracks(bump(200, 50), bump(200, 57));
        crude_align(&mut ctx, CrudeTarget::WholeSignal);
        assert_eq!(ctx.crude_delay, 7 * 64);
    }

    #[test]
    fn piece_estimate_adds_global_delay() {
        let mut ctx = ctx_with_tracks(bump(300, 100), bump(300, 104));
        ctx.crude_delay = 2 * 64;
        ctx.pieces.push(Piece {
            search_start: 60,
            search_end: 180,
            ..Piece::default()
        });
        crude_align(&mut ctx, CrudeTarget::Piece(0));
        assert_eq!(ctx.pieces[0].delay_est, 4 * 64);
    }

    #[test]
    fn probe_uses_its_own_estimate() {
        let mut ctx = ctx_with_tracks(bump(300, 100), bump(300, 97));
        ctx.probe = Piece {
            search_start: 50,
            search_end: 200,
            delay_est: -3 * 64,
            ..Piece::default()
        };
        crude_align(&mut ctx, CrudeTarget::Probe);
        assert_eq!(ctx.probe.delay, -3 * 64);
    }

    #[test]
    fn degenerate_window_yields_zero_lag() {
        let mut ctx = ctx_with_tracks(bump(100, 10), bump(100, 10));
        ctx.probe = Piece {
            search_start: 40,
            search_end: 41,
            delay_est: 128,
            ..Piece::default()
        };
        crude_align(&mut ctx, CrudeTarget::Probe);
        assert_eq!(ctx.probe.delay, 128);
    }

    #[test]
    fn time_align_recovers_sample_delay() {
        let p = ModelParams::for_bandwidth(Bandwidth::Wideband);
        let n = 32_000;
        let mut state = 1u32;
        let src: Vec<f32> = (0..n)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state % 2001) as f32 - 1000.0
            })
            .collect();
        let delay = 3 * 64 + 11;
        let mut rec = vec![0.0f32; delay];
        rec.extend_from_slice(&src[..n - delay]);

        let mut ctx = RatingContext::new(p, src, rec);
        ctx.pieces.push(Piece {
            search_start: 100,
            search_end: 400,
            delay_est: 3 * 64,
            ..Piece::default()
        });
        time_align(&mut ctx, 0);
        assert_eq!(ctx.pieces[0].delay, delay as i64);
        assert!(ctx.pieces[0].confidence > 0.0);
    }
}

//! One rating, end to end.
//!
//! ## Pipeline stages
//!
//! ```text
//! 1. Reject tracks with under 1/4 s left after guard trimming
//! 2. Level normalization (align-filtered power -> TARGET_AVG_POWER)
//! 3. IRS receive filter; snapshot both tracks for the model
//! 4. Alignment copies: DC block + input IIR bank, energy VAD
//! 5. Whole-signal crude delay, then per-piece alignment and splitting
//! 6. Restore the snapshots, pad the shorter track, run the model
//! ```

use tracing::{debug, info};

use super::context::{RatingContext, SignalInfo};
use crate::{
    align::{crude_align, CrudeTarget},
    error::{RatingError, Result, Track},
    model::perceptual_model,
    params::ModelParams,
    preprocess::{apply_curve_filter, input_filter, normalize_level, IRS_FILTER},
    segment::locate_and_align_pieces,
    vad::EnergyVad,
};

fn check_length(track: Track, info: &SignalInfo, params: &ModelParams) -> Result<()> {
    let usable = info.n_samples as i64 - 2 * params.guard() as i64;
    let required = params.min_usable_samples() as i64;
    if usable < required {
        return Err(RatingError::InputTooShort {
            track,
            usable_samples: usable,
            required_samples: required,
        });
    }
    Ok(())
}

/// Rate the tracks held by `ctx`, leaving the indicators, pieces and raw
/// score in it.
///
/// # Errors
/// - `InputTooShort` when either track is too short.
/// - `InternalInconsistency` when a stage sees impossible bounds or no
///   speech piece survives alignment.
pub fn measure(ctx: &mut RatingContext) -> Result<()> {
    let params = ctx.params;
    check_length(Track::Reference, &ctx.src, &params)?;
    check_length(Track::Degraded, &ctx.rec, &params)?;

    let max_n = ctx.max_n_samples();
    normalize_level(&mut ctx.src, max_n, &params, &mut ctx.fft)?;
    normalize_level(&mut ctx.rec, max_n, &params, &mut ctx.fft)?;

    apply_curve_filter(&mut ctx.src.data, &IRS_FILTER, &params, &mut ctx.fft);
    apply_curve_filter(&mut ctx.rec.data, &IRS_FILTER, &params, &mut ctx.fft);
    let model_ref = ctx.src.data.clone();
    let model_deg = ctx.rec.data.clone();

    input_filter(&mut ctx.src, &params);
    input_filter(&mut ctx.rec, &params);

    let vad = EnergyVad::new(params.downsample);
    ctx.src.activity = vad.detect(ctx.src.data.as_slice(), ctx.src.n_samples);
    ctx.rec.activity = vad.detect(ctx.rec.data.as_slice(), ctx.rec.n_samples);
    debug!(
        src_speech = ctx.src.activity.has_speech(),
        rec_speech = ctx.rec.activity.has_speech(),
        "activity detected"
    );

    crude_align(ctx, CrudeTarget::WholeSignal);
    locate_and_align_pieces(ctx);

    ctx.src.data = model_ref;
    ctx.rec.data = model_deg;
    let padded = max_n + params.padding();
    if ctx.src.n_samples < ctx.rec.n_samples {
        ctx.src.data = ctx.src.data.resized(padded);
    } else if ctx.rec.n_samples < ctx.src.n_samples {
        ctx.rec.data = ctx.rec.data.resized(padded);
    }

    let out = perceptual_model(ctx)?;
    ctx.d_indicator = out.d_indicator;
    ctx.a_indicator = out.a_indicator;
    ctx.rate = out.raw_score;

    info!(
        raw_score = out.raw_score,
        d_indicator = out.d_indicator,
        a_indicator = out.a_indicator,
        crude_delay = ctx.crude_delay,
        pieces = ctx.pieces.len(),
        "rating complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Bandwidth;

    #[test]
    fn short_reference_is_rejected() {
        let p = ModelParams::for_bandwidth(Bandwidth::Wideband);
        let short = 2 * p.guard() + p.min_usable_samples() - 1;
        let mut ctx = RatingContext::new(p, vec![0.0; short], vec![0.0; 48_000]);
        match measure(&mut ctx) {
            Err(RatingError::InputTooShort {
                track,
                usable_samples,
                required_samples,
            }) => {
                assert_eq!(track, Track::Reference);
                assert_eq!(usable_samples, required_samples - 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn short_degraded_is_rejected() {
        let p = ModelParams::for_bandwidth(Bandwidth::Narrowband);
        let mut ctx = RatingContext::new(p, vec![0.0; 24_000], vec![0.0; 100]);
        assert!(matches!(
            measure(&mut ctx),
            Err(RatingError::InputTooShort {
                track: Track::Degraded,
                ..
            })
        ));
    }
}

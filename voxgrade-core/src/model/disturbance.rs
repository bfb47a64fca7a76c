//! Per-frame disturbance from the reference/degraded loudness difference.
//!
//! ## Algorithm
//!
//! 1. Level equalization: scale the degraded Bark row by
//!    `(ref_audible + 5e3) / (deg_audible + 5e3)`, smoothed `0.2/0.8`
//!    against the previous frame and clamped to `[MIN_SCALE, MAX_SCALE]`.
//! 2. Loudness of both rows; signed difference with a dead zone of a
//!    quarter of the smaller loudness.
//! 3. Symmetric disturbance `D`: width-weighted L2 norm over bands `1..`.
//! 4. Asymmetric disturbance `A`: the same densities weighted by
//!    `((deg + 50) / (ref + 50))^1.2` (capped at 12, zero below 3), L1 norm.

use ndarray::{ArrayView1, ArrayViewMut1};

use super::bark::{intensity_warping, total_audible};
use crate::params::{BarkTable, A_POW_F, D_POW_F, MAX_SCALE, MIN_SCALE};

/// Width-weighted pseudo `Lp` norm over bands `1..`.
///
/// Returns 0 for a total band width of zero.
pub fn pseudo_lp(x: &[f32], width: &[f64], p: f32) -> f32 {
    let p = p as f64;
    let mut total_weight = 0.0f64;
    let mut sum = 0.0f64;
    for (&v, &w) in x.iter().zip(width).skip(1) {
        sum += ((v.abs() as f64) * w).powf(p);
        total_weight += w;
    }
    if total_weight <= 0.0 {
        return 0.0;
    }
    ((sum / total_weight).powf(1.0 / p) * total_weight) as f32
}

/// Weight disturbance densities by the degraded/reference power ratio.
pub fn apply_asymmetry(dens: &mut [f32], reference: ArrayView1<'_, f32>, degraded: ArrayView1<'_, f32>) {
    for ((d, &r), &g) in dens.iter_mut().zip(reference).zip(degraded) {
        let mut h = ((g + 50.0) / (r + 50.0)).powf(1.2);
        if h > 12.0 {
            h = 12.0;
        }
        if h < 3.0 {
            h = 0.0;
        }
        *d *= h;
    }
}

/// Disturbance results for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameDisturbance {
    /// Audible reference power (threshold factor 1).
    pub ref_audible: f32,
    pub symmetric: f32,
    pub asymmetric: f32,
}

/// Runs the per-frame disturbance computation, carrying the smoothed level
/// scale from frame to frame.
#[derive(Debug)]
pub struct DisturbanceModel {
    bark: &'static BarkTable,
    old_scale: f32,
    loud_ref: Vec<f32>,
    loud_deg: Vec<f32>,
    dens: Vec<f32>,
}

impl DisturbanceModel {
    pub fn new(bark: &'static BarkTable) -> Self {
        let bands = bark.bands();
        Self {
            bark,
            old_scale: 1.0,
            loud_ref: vec![0.0; bands],
            loud_deg: vec![0.0; bands],
            dens: vec![0.0; bands],
        }
    }

    /// Forget the level history; the next frame starts from scale 1.
    pub fn reset(&mut self) {
        self.old_scale = 1.0;
    }

    /// Process frame `frame`. The degraded row is scaled in place.
    pub fn process(
        &mut self,
        frame: usize,
        reference: ArrayView1<'_, f32>,
        mut degraded: ArrayViewMut1<'_, f32>,
    ) -> FrameDisturbance {
        let bark = self.bark;
        let ref_audible = total_audible(reference, bark, 1.0);
        let deg_audible = total_audible(degraded.view(), bark, 1.0);

        let mut scale = (ref_audible + 5e3) / (deg_audible + 5e3);
        if frame > 0 {
            scale = 0.2 * self.old_scale + 0.8 * scale;
        }
        self.old_scale = scale;
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        degraded.mapv_inplace(|v| v * scale);

        intensity_warping(reference, bark, &mut self.loud_ref);
        intensity_warping(degraded.view(), bark, &mut self.loud_deg);

        for ((d, &lr), &ld) in self.dens.iter_mut().zip(&self.loud_ref).zip(&self.loud_deg) {
            let diff = ld - lr;
            let m = 0.25 * ld.min(lr);
            *d = if diff > m {
                diff - m
            } else if diff < -m {
                diff + m
            } else {
                0.0
            };
        }

        let width = bark.width_bark();
        let symmetric = pseudo_lp(&self.dens, width, D_POW_F);
        apply_asymmetry(&mut self.dens, reference, degraded.view());
        let asymmetric = pseudo_lp(&self.dens, width, A_POW_F);

        FrameDisturbance {
            ref_audible,
            symmetric,
            asymmetric,
        }
    }
}

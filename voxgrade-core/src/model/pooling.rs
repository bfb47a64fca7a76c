//! Time pooling of per-frame disturbances.

/// Per-frame time weights for frames `0..n_frames`.
///
/// Files longer than 1000 frames weight later frames up linearly, by at most
/// a factor of 2 at the end. `frames_in_signal` is the frame count of the
/// guard-trimmed longer track.
pub fn time_weights(n_frames: usize, frames_in_signal: i64) -> Vec<f32> {
    if n_frames <= 1000 || frames_in_signal <= 0 {
        return vec![1.0; n_frames];
    }
    let n = frames_in_signal as f64;
    let factor = ((n - 1000.0) / 5500.0).min(0.5);
    (0..n_frames)
        .map(|frame| ((1.0 - factor) + factor * frame as f64 / n) as f32)
        .collect()
}

/// Divide both disturbance series by `((ref_power + 1e5) / 1e7)^0.04` and cap
/// them at 45.
pub fn normalize_by_level(symmetric: &mut [f32], asymmetric: &mut [f32], ref_power: &[f32]) {
    for ((d, a), &p) in symmetric.iter_mut().zip(asymmetric.iter_mut()).zip(ref_power) {
        let h = ((p as f64 + 1e5) / 1e7).powf(0.04) as f32;
        *d = (*d / h).min(45.0);
        *a = (*a / h).min(45.0);
    }
}

/// Two-level `Lp/Lq` pooling over frames `start..=stop`.
///
/// Syllables of `NUMBER_OF_PSQM_FRAMES_PER_SYLLABE` frames, hopping by half
/// a syllable, are pooled with power `p_syllable`. The syllable values are
/// then pooled over time with power `p_time`, each weighted by the time
/// weight of its first frame. Frames past `stop` count as zero inside the
/// last syllables. Returns 0 when no syllable carries weight.
pub fn lpq_weight(
    start: usize,
    stop: usize,
    p_syllable: f32,
    p_time: f32,
    disturbance: &[f32],
    time_weight: &[f32],
) -> f32 {
    use crate::params::NUMBER_OF_PSQM_FRAMES_PER_SYLLABE as SYLLABLE;

    let (ps, pt) = (p_syllable as f64, p_time as f64);
    let mut result = 0.0f64;
    let mut total_weight = 0.0f64;

    let mut syllable_start = start;
    while syllable_start <= stop {
        let sum: f64 = (syllable_start..syllable_start + SYLLABLE)
            .filter(|&f| f <= stop)
            .map(|f| (disturbance.get(f).copied().unwrap_or(0.0) as f64).powf(ps))
            .sum();
        let syllable = (sum / SYLLABLE as f64).powf(1.0 / ps);

        let w = time_weight.get(syllable_start - start).copied().unwrap_or(1.0) as f64;
        result += (w * syllable).powf(pt);
        total_weight += w.powf(pt);
        syllable_start += SYLLABLE / 2;
    }

    if total_weight <= 0.0 {
        return 0.0;
    }
    (result / total_weight).powf(1.0 / pt) as f32
}

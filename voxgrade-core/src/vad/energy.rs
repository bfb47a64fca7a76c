//! Adaptive-threshold energy VAD.
//!
//! ## Algorithm
//!
//! 1. Mean energy per window of `window` samples.
//! 2. Floor every window at `1e-4 * max` (or 1.0 for an all-zero input).
//! 3. Starting from the global mean, iterate the threshold 12 times as
//!    `1.001 * (mean + 2 * std)` of the windows at or below it.
//! 4. Negate sub-threshold windows; force the first and last negative.
//! 5. Drop bursts of `min_speech_len` windows or fewer. When the signal is
//!    at least 60 dB over the noise, also drop bursts averaging under
//!    three times the threshold.
//! 6. Bridge gaps of `join_speech_len` windows or fewer at the floor level.
//! 7. With no speech left, take the absolute value everywhere.
//! 8. Taper burst edges to 10% / 30% of the neighbouring speech energy,
//!    then clamp negatives to zero and derive the log track.

use tracing::{debug, warn};

use super::ActivityTrack;
use crate::params::{JOIN_SPEECH_LEN, MIN_SPEECH_LEN};

const THRESHOLD_ITERATIONS: usize = 12;

#[derive(Debug, Clone)]
pub struct EnergyVad {
    /// Samples per window (`DOWNSAMPLE`).
    window: usize,
    /// Bursts this short or shorter are discarded.
    min_speech_len: usize,
    /// Gaps this short or shorter are bridged.
    join_speech_len: usize,
}

impl EnergyVad {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            min_speech_len: MIN_SPEECH_LEN,
            join_speech_len: JOIN_SPEECH_LEN,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Classify the first `n_samples` of `data`.
    pub fn detect(&self, data: &[f32], n_samples: usize) -> ActivityTrack {
        let n_samples = n_samples.min(data.len());
        let n = if self.window == 0 {
            0
        } else {
            n_samples / self.window
        };
        if n == 0 {
            return ActivityTrack::default();
        }

        let mut vad: Vec<f32> = data[..n * self.window]
            .chunks_exact(self.window)
            .map(|w| w.iter().map(|&g| g * g).sum::<f32>() / self.window as f32)
            .collect();

        let mut thresh = vad.iter().sum::<f32>() / n as f32;

        let peak = vad.iter().copied().fold(0.0f32, f32::max);
        let level_min = if peak > 0.0 { peak * 1.0e-4 } else { 1.0 };
        for v in vad.iter_mut() {
            if *v < level_min {
                *v = level_min;
            }
        }

        for _ in 0..THRESHOLD_ITERATIONS {
            let (mut noise, mut std_noise, mut count) = (0.0f32, 0.0f32, 0usize);
            for &v in vad.iter().filter(|&&v| v <= thresh) {
                noise += v;
                count += 1;
            }
            if count > 0 {
                noise /= count as f32;
                for &v in vad.iter().filter(|&&v| v <= thresh) {
                    std_noise += (v - noise) * (v - noise);
                }
                std_noise = (std_noise / count as f32).sqrt();
            }
            thresh = 1.001 * (noise + 2.0 * std_noise);
        }

        let (mut level_sig, mut level_noise, mut active) = (0.0f32, 0.0f32, 0usize);
        for &v in &vad {
            if v > thresh {
                level_sig += v;
                active += 1;
            } else {
                level_noise += v;
            }
        }
        if active > 0 {
            level_sig /= active as f32;
        } else {
            thresh = -1.0;
        }
        if active < n {
            level_noise /= (n - active) as f32;
        } else {
            level_noise = 1.0;
        }

        for v in vad.iter_mut() {
            if *v <= thresh {
                *v = -*v;
            }
        }
        vad[0] = -level_min;
        vad[n - 1] = -level_min;

        self.drop_bursts(&mut vad, |_, len| len <= self.min_speech_len);
        if level_sig >= level_noise * 1000.0 {
            self.drop_bursts(&mut vad, |burst, len| {
                burst.iter().sum::<f32>() < 3.0 * thresh * len as f32
            });
        }
        self.join_gaps(&mut vad, level_min);

        let any_onset = (1..n).any(|c| vad[c] > 0.0 && vad[c - 1] <= 0.0);
        if !any_onset {
            warn!(windows = n, "no speech burst found, treating whole track as active");
            for v in vad.iter_mut() {
                *v = v.abs();
            }
            vad[0] = -level_min;
            vad[n - 1] = -level_min;
        }

        taper_edges(&mut vad);

        for v in vad.iter_mut() {
            if *v < 0.0 {
                *v = 0.0;
            }
        }

        if thresh <= 0.0 {
            thresh = level_min;
        }
        let log_vad = vad
            .iter()
            .map(|&v| if v <= thresh { 0.0 } else { (v / thresh).ln() })
            .collect();

        debug!(
            windows = n,
            threshold = thresh,
            level_sig,
            level_noise,
            "activity track computed"
        );

        ActivityTrack {
            vad,
            log_vad,
            threshold: thresh,
        }
    }

    /// Flip back to negative every burst for which `reject(burst, len)` holds.
    fn drop_bursts(&self, vad: &mut [f32], reject: impl Fn(&[f32], usize) -> bool) {
        let mut start = 0;
        for c in 1..vad.len() {
            if vad[c] > 0.0 && vad[c - 1] <= 0.0 {
                start = c;
            }
            if vad[c] <= 0.0 && vad[c - 1] > 0.0 {
                let len = c - start;
                if reject(&vad[start..c], len) {
                    for v in &mut vad[start..c] {
                        *v = -*v;
                    }
                }
            }
        }
    }

    fn join_gaps(&self, vad: &mut [f32], level_min: f32) {
        let mut finish = 0;
        for c in 1..vad.len() {
            if vad[c] > 0.0 && vad[c - 1] <= 0.0 {
                if finish > 0 && c - finish <= self.join_speech_len {
                    vad[finish..c].fill(level_min);
                }
            }
            if vad[c] <= 0.0 && vad[c - 1] > 0.0 {
                finish = c;
            }
        }
    }
}

/// Ramp the windows around every on/off edge.
fn taper_edges(vad: &mut [f32]) {
    let n = vad.len();
    let mut c = 3;
    while c + 2 < n {
        if vad[c] > 0.0 && vad[c - 2] <= 0.0 {
            vad[c - 2] = vad[c] * 0.1;
            vad[c - 1] = vad[c] * 0.3;
            c += 1;
        }
        if vad[c] <= 0.0 && vad[c - 1] > 0.0 {
            vad[c] = vad[c - 1] * 0.3;
            vad[c + 1] = vad[c - 1] * 0.1;
            c += 3;
        }
        c += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: usize = 64;

    /// Low noise floor with a loud burst over windows `[on, off)`.
    fn burst_signal(windows: usize, on: usize, off: usize) -> Vec<f32> {
        (0..windows * WINDOW)
            .map(|i| {
                let w = i / WINDOW;
                let noise = 0.5 * (((i * 7919) % 13) as f32 - 6.0) / 6.0;
                if (on..off).contains(&w) {
                    noise + 3000.0 * ((i as f32) * 0.2).sin()
                } else {
                    noise
                }
            })
            .collect()
    }

    #[test]
    fn single_burst_is_detected_with_taper() {
        let (on, off) = (100, 180);
        let data = burst_signal(300, on, off);
        let track = EnergyVad::new(WINDOW).detect(&data, data.len());

        assert_eq!(track.len(), 300);
        for (w, &v) in track.vad.iter().enumerate() {
            if (on..off).contains(&w) {
                assert!(v > 0.0, "window {w} should be speech");
            } else if w + 2 < on || w > off + 1 {
                assert_eq!(v, 0.0, "window {w} should be silent");
            }
        }
        // taper: 10% two windows before, 30% one before
        let first = track.vad[on];
        assert!((track.vad[on - 2] - 0.1 * first).abs() <= 1e-3 * first);
        assert!((track.vad[on - 1] - 0.3 * first).abs() <= 1e-3 * first);
        assert!(track.log_vad[on + 10] > 0.0);
        assert_eq!(track.log_vad[10], 0.0);
    }

    #[test]
    fn short_bursts_are_dropped() {
        let data = burst_signal(300, 150, 153);
        // a second real burst so the fallback does not kick in
        let mut data2 = data.clone();
        for (i, x) in data2.iter_mut().enumerate() {
            let w = i / WINDOW;
            if (40..120).contains(&w) {
                *x += 3000.0 * ((i as f32) * 0.2).sin();
            }
        }
        let track = EnergyVad::new(WINDOW).detect(&data2, data2.len());
        assert!(track.vad[151] == 0.0);
        assert!(track.vad[80] > 0.0);
    }

    #[test]
    fn close_bursts_are_joined() {
        let mut data = burst_signal(400, 100, 160);
        for (i, x) in data.iter_mut().enumerate() {
            let w = i / WINDOW;
            if (180..240).contains(&w) {
                *x += 3000.0 * ((i as f32) * 0.2).sin();
            }
        }
        let track = EnergyVad::new(WINDOW).detect(&data, data.len());
        for w in 100..240 {
            assert!(track.vad[w] > 0.0, "window {w} should be bridged");
        }
    }

    #[test]
    fn silence_falls_back_to_full_coverage() {
        let data = vec![0.0f32; 100 * WINDOW];
        let track = EnergyVad::new(WINDOW).detect(&data, data.len());
        assert_eq!(track.len(), 100);
        assert_eq!(track.vad[0], 0.0);
        assert_eq!(track.vad[99], 0.0);
        assert!(track.vad[50] > 0.0);
        assert!(track.log_vad.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn short_input_yields_empty_track() {
        let track = EnergyVad::new(WINDOW).detect(&[1.0; 10], 10);
        assert!(track.is_empty());
        assert!(!track.has_speech());
    }
}

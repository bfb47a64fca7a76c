//! Whole-pipeline behaviour on synthetic speech-like signals.

use rand::{rngs::StdRng, Rng, SeedableRng};
use voxgrade_core::{Rater, RatingConfig, RatingError, Track};

/// Harmonic bursts, 0.5 s on and 0.3 s off, after 0.5 s of silence.
/// Each burst gets its own pitch and level so that lags are unambiguous.
fn speech_like(rate: u32, seconds: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = (rate as f32 * seconds) as usize;
    let lead = rate as usize / 2;
    let on = rate as usize / 2;
    let period = on + (rate as usize * 3) / 10;

    let mut out = vec![0.0f32; n];
    let mut start = lead;
    while start + on < n {
        let f0: f64 = rng.gen_range(110.0..240.0);
        let level: f64 = rng.gen_range(1500.0..4000.0);
        for k in 0..on {
            let t = k as f64 / rate as f64;
            // raised-cosine envelope over the burst
            let env = 0.5 - 0.5 * (std::f64::consts::TAU * k as f64 / on as f64).cos();
            let f = f0 * (1.0 + 0.1 * (std::f64::consts::TAU * 3.0 * t).sin());
            let phase = std::f64::consts::TAU * f * t;
            let v = phase.sin() + 0.6 * (2.0 * phase).sin() + 0.35 * (3.0 * phase).sin()
                + 0.2 * (5.0 * phase).sin();
            out[start + k] = (level * env * v) as f32;
        }
        start += period;
    }
    out
}

fn with_noise(clean: &[f32], snr_db: f32, seed: u64) -> Vec<f32> {
    let active: Vec<f32> = clean.iter().copied().filter(|v| *v != 0.0).collect();
    let signal_power = active.iter().map(|v| v * v).sum::<f32>() / active.len() as f32;
    let noise_rms = (signal_power / 10f32.powf(snr_db / 10.0)).sqrt();
    // uniform noise in [-a, a] has rms a / sqrt(3)
    let amp = noise_rms * 3f32.sqrt();
    let mut rng = StdRng::seed_from_u64(seed);
    clean
        .iter()
        .map(|&v| v + amp * rng.gen_range(-1.0f32..1.0))
        .collect()
}

fn delayed(clean: &[f32], by: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; by];
    out.extend_from_slice(clean);
    out
}

#[test]
fn identical_signals_score_near_maximum() {
    let rater = Rater::default();
    let reference = speech_like(16_000, 5.0, 1);
    let report = rater.rate(&reference, &reference).unwrap();
    assert!(report.score >= 4.4, "score={}", report.score);
    assert!(report.score <= 5.0);
    assert!(!report.pieces.is_empty());
    assert!(report.pieces.iter().all(|p| p.delay.abs() <= 1));
}

#[test]
fn narrowband_identical_signals_score_near_maximum() {
    let rater = Rater::new(RatingConfig::narrowband());
    let reference = speech_like(8_000, 5.0, 2);
    let report = rater.rate(&reference, &reference).unwrap();
    assert!(report.score >= 4.4, "score={}", report.score);
    assert_eq!(report.sample_rate, 8_000);
}

#[test]
fn pure_delay_barely_moves_the_score() {
    let rater = Rater::default();
    let reference = speech_like(16_000, 5.0, 3);
    let clean = rater.rate(&reference, &reference).unwrap();
    let late = rater.rate(&reference, &delayed(&reference, 400)).unwrap();

    assert!(
        (clean.score - late.score).abs() <= 0.3,
        "clean={} delayed={}",
        clean.score,
        late.score
    );
    assert!(late.pieces.iter().any(|p| (p.delay - 400).abs() <= 2));
}

#[test]
fn more_noise_never_scores_higher() {
    let rater = Rater::default();
    let reference = speech_like(16_000, 5.0, 4);
    let clean = rater.rate(&reference, &reference).unwrap().score;

    let scores: Vec<f32> = [30.0, 20.0, 10.0]
        .iter()
        .map(|&snr| {
            rater
                .rate(&reference, &with_noise(&reference, snr, 99))
                .unwrap()
                .score
        })
        .collect();

    assert!(clean >= scores[0], "clean={clean} 30dB={}", scores[0]);
    assert!(scores[0] >= scores[1], "30dB={} 20dB={}", scores[0], scores[1]);
    assert!(scores[1] >= scores[2], "20dB={} 10dB={}", scores[1], scores[2]);
    assert!(clean - scores[2] >= 0.5, "clean={clean} 10dB={}", scores[2]);
}

#[test]
fn mismatched_lengths_are_rated() {
    let rater = Rater::default();
    let reference = speech_like(16_000, 5.0, 5);

    let mut longer = reference.clone();
    longer.extend(std::iter::repeat(0.0).take(32_000));
    let report = rater.rate(&reference, &longer).unwrap();
    assert!((1.0..=5.0).contains(&report.score));

    let shorter = &reference[..reference.len() - 16_000];
    let report = rater.rate(&reference, shorter).unwrap();
    assert!((1.0..=5.0).contains(&report.score));

    let report = rater.rate(shorter, &reference).unwrap();
    assert!((1.0..=5.0).contains(&report.score));
}

#[test]
fn too_short_input_is_rejected() {
    let rater = Rater::default();
    let reference = speech_like(16_000, 5.0, 6);
    // two guard regions plus just under a quarter second
    let short = &reference[..2 * 4_800 + 3_999];

    match rater.rate(&reference, short) {
        Err(RatingError::InputTooShort {
            track,
            usable_samples,
            required_samples,
        }) => {
            assert_eq!(track, Track::Degraded);
            assert_eq!(usable_samples, 3_999);
            assert_eq!(required_samples, 4_000);
        }
        other => panic!("expected InputTooShort, got {other:?}"),
    }

    assert!(matches!(
        rater.rate(short, &reference),
        Err(RatingError::InputTooShort {
            track: Track::Reference,
            ..
        })
    ));
}

#[test]
fn ratings_are_deterministic() {
    let rater = Rater::default();
    let reference = speech_like(16_000, 4.0, 7);
    let degraded = with_noise(&reference, 15.0, 8);

    let a = rater.rate(&reference, &degraded).unwrap();
    let b = rater.rate(&reference, &degraded).unwrap();
    assert_eq!(a, b);
    assert_eq!(rater.rate_raw(&reference, &degraded).unwrap(), a.raw_score);
}

#[test]
fn raw_score_is_unclamped_and_offset() {
    let rater = Rater::default();
    let reference = speech_like(16_000, 4.0, 9);
    let report = rater.rate(&reference, &with_noise(&reference, 20.0, 10)).unwrap();
    let expected = (report.raw_score + 0.5).clamp(1.0, 5.0);
    assert!((report.score - expected).abs() < 1e-6);
}

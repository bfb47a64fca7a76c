//! WAV input.
//!
//! Tracks are decoded with hound, downmixed to mono and scaled to the
//! 16-bit integer range the model thresholds assume (full scale = 32767),
//! whatever the file's sample format. [`load_for_rating`] then converts to
//! the working rate.

pub mod resample;

use std::path::Path;

use tracing::debug;

pub use resample::RateConverter;

use crate::{error::Result, params::ModelParams};

/// Full-scale amplitude of a loaded track.
pub const FULL_SCALE: f32 = i16::MAX as f32;

/// Decode a WAV file to mono samples at `FULL_SCALE`, returning them with
/// the file's sample rate.
pub fn load_wav(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32)> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| v * FULL_SCALE))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max = ((1_i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max * FULL_SCALE))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    debug!(
        path = %path.display(),
        channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        frames = interleaved.len() / channels,
        "decoded wav"
    );

    if channels == 1 {
        return Ok((interleaved, spec.sample_rate));
    }
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}

/// Load a WAV file at the working rate of `params`.
pub fn load_for_rating(path: impl AsRef<Path>, params: &ModelParams) -> Result<Vec<f32>> {
    let (samples, rate) = load_wav(path)?;
    RateConverter::new(rate, params.sample_rate)?.convert(&samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::RatingError, params::Bandwidth};
    use std::path::PathBuf;

    fn temp_wav(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("voxgrade-{}-{name}.wav", std::process::id()))
    }

    fn write_i16(path: &Path, rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            w.write_sample(s).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn i16_mono_keeps_integer_scale() {
        let path = temp_wav("mono");
        write_i16(&path, 16_000, 1, &[0, 1000, -1000, i16::MAX]);
        let (samples, rate) = load_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(rate, 16_000);
        assert_eq!(samples, vec![0.0, 1000.0, -1000.0, FULL_SCALE]);
    }

    #[test]
    fn stereo_is_downmixed() {
        let path = temp_wav("stereo");
        write_i16(&path, 8_000, 2, &[1000, 3000, -200, 200]);
        let (samples, _) = load_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(samples, vec![2000.0, 0.0]);
    }

    #[test]
    fn float_wav_is_scaled() {
        let path = temp_wav("float");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut w = hound::WavWriter::create(&path, spec).unwrap();
        w.write_sample(0.5f32).unwrap();
        w.finalize().unwrap();
        let (samples, _) = load_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(samples, vec![0.5 * FULL_SCALE]);
    }

    #[test]
    fn loading_converts_to_working_rate() {
        let path = temp_wav("rate");
        write_i16(&path, 16_000, 1, &vec![100; 1600]);
        let nb = ModelParams::for_bandwidth(Bandwidth::Narrowband);
        let samples = load_for_rating(&path, &nb).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(samples.len(), 800);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_wav("/nonexistent/voxgrade.wav").unwrap_err();
        assert!(matches!(err, RatingError::Wav(_)));
    }
}

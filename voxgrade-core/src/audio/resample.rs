//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! ## Design
//!
//! WAV inputs arrive at whatever rate they were recorded at; the model runs
//! at 8 or 16 kHz. `RateConverter` converts a whole track at once: full
//! chunks go through `process_into_buffer`, the remainder and the filter
//! tail through `process_partial_into_buffer`. The leading filter delay is
//! dropped so the output lines up with the input.
//!
//! When input rate == target rate, `RateConverter` is a passthrough and no
//! rubato session is created at all.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::info;

use crate::error::{RatingError, Result};

/// Input frames per rubato call.
const CHUNK_SIZE: usize = 1024;

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when input rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    ratio: f64,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// # Errors
    /// Returns `RatingError::Resample` if rubato fails to initialise.
    pub fn new(input_rate: u32, target_rate: u32) -> Result<Self> {
        let ratio = target_rate as f64 / input_rate as f64;
        if input_rate == target_rate {
            return Ok(Self {
                resampler: None,
                ratio,
                output_buf: Vec::new(),
            });
        }

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio
            PolynomialDegree::Cubic,
            CHUNK_SIZE,
            1, // mono
        )
        .map_err(|e| RatingError::Resample(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        info!(input_rate, target_rate, max_out, "resampling input");

        Ok(Self {
            resampler: Some(resampler),
            ratio,
            output_buf: vec![vec![0f32; max_out]; 1],
        })
    }

    /// Convert a complete track. The output holds `round(len * ratio)`
    /// samples.
    pub fn convert(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let Some(ref mut resampler) = self.resampler else {
            return Ok(samples.to_vec());
        };
        let expected = (samples.len() as f64 * self.ratio).round() as usize;
        let delay = resampler.output_delay();
        let mut out = Vec::with_capacity(expected + delay);

        let mut chunks = samples.chunks_exact(CHUNK_SIZE);
        for chunk in &mut chunks {
            let (_, produced) = resampler
                .process_into_buffer(&[chunk], &mut self.output_buf, None)
                .map_err(|e| RatingError::Resample(e.to_string()))?;
            out.extend_from_slice(&self.output_buf[0][..produced]);
        }

        let rest = chunks.remainder();
        if !rest.is_empty() {
            let (_, produced) = resampler
                .process_partial_into_buffer(Some(&[rest][..]), &mut self.output_buf, None)
                .map_err(|e| RatingError::Resample(e.to_string()))?;
            out.extend_from_slice(&self.output_buf[0][..produced]);
        }

        // flush the filter tail with silence
        while out.len() < expected + delay {
            let (_, produced) = resampler
                .process_partial_into_buffer(None::<&[&[f32]]>, &mut self.output_buf, None)
                .map_err(|e| RatingError::Resample(e.to_string()))?;
            if produced == 0 {
                break;
            }
            out.extend_from_slice(&self.output_buf[0][..produced]);
        }
        resampler.reset();

        let mut out = out.split_off(delay.min(out.len()));
        out.resize(expected, 0.0);
        Ok(out)
    }

    /// Returns `true` when input rate == target rate.
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

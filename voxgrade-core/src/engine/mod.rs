//! `Rater`: top-level entry point.
//!
//! ## Lifecycle
//!
//! ```text
//! Rater::new(config)
//!     └─► rate(reference, degraded)
//!             └─► RatingContext::new  → per-call state, nothing shared
//!                 └─► pipeline::measure → indicators + raw score
//!                     └─► RatingReport  → clamped score + per-piece delays
//! ```
//!
//! A `Rater` holds only its configuration. Every call builds a fresh
//! context, so one `Rater` can be shared across threads and calls never
//! observe each other.

pub mod context;
pub mod pipeline;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use context::{Piece, RatingContext, SignalInfo};
pub use pipeline::measure;

use crate::{
    audio::load_for_rating,
    error::Result,
    params::{Bandwidth, ModelParams},
    report::RatingReport,
};

/// Configuration for [`Rater`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RatingConfig {
    /// Working bandwidth; inputs must be at its rate. Default: wideband.
    pub bandwidth: Bandwidth,
    /// Added to the raw model output before clamping to `[1, 5]`.
    /// Default: 0.5.
    pub score_offset: f32,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            bandwidth: Bandwidth::Wideband,
            score_offset: 0.5,
        }
    }
}

impl RatingConfig {
    pub fn narrowband() -> Self {
        Self {
            bandwidth: Bandwidth::Narrowband,
            ..Self::default()
        }
    }

    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Rates degraded speech against its reference.
#[derive(Debug, Clone)]
pub struct Rater {
    config: RatingConfig,
    params: ModelParams,
}

impl Default for Rater {
    fn default() -> Self {
        Self::new(RatingConfig::default())
    }
}

impl Rater {
    pub fn new(config: RatingConfig) -> Self {
        Self {
            params: ModelParams::for_bandwidth(config.bandwidth),
            config,
        }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Model constants for the configured bandwidth.
    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Rate two tracks sampled at `params().sample_rate`.
    ///
    /// The score is `clamp(raw + score_offset, 1, 5)`; the report also
    /// carries the raw output, both indicators and every piece delay.
    pub fn rate(&self, reference: &[f32], degraded: &[f32]) -> Result<RatingReport> {
        let ctx = self.run(reference, degraded)?;
        let score = (ctx.rate + self.config.score_offset).clamp(1.0, 5.0);
        Ok(RatingReport::from_context(&ctx, score))
    }

    /// Unclamped model output, without the score offset.
    pub fn rate_raw(&self, reference: &[f32], degraded: &[f32]) -> Result<f32> {
        Ok(self.run(reference, degraded)?.rate)
    }

    /// Load two WAV files, convert them to the working rate and rate them.
    pub fn rate_files(
        &self,
        reference: impl AsRef<Path>,
        degraded: impl AsRef<Path>,
    ) -> Result<RatingReport> {
        let reference = load_for_rating(reference, &self.params)?;
        let degraded = load_for_rating(degraded, &self.params)?;
        self.rate(&reference, &degraded)
    }

    fn run(&self, reference: &[f32], degraded: &[f32]) -> Result<RatingContext> {
        debug!(
            bandwidth = ?self.config.bandwidth,
            ref_samples = reference.len(),
            deg_samples = degraded.len(),
            "rating"
        );
        let mut ctx = RatingContext::new(self.params, reference.to_vec(), degraded.to_vec());
        pipeline::measure(&mut ctx)?;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RatingError;

    #[test]
    fn default_config_is_wideband_with_half_point_offset() {
        let c = RatingConfig::default();
        assert_eq!(c.bandwidth, Bandwidth::Wideband);
        assert_eq!(c.score_offset, 0.5);
        assert_eq!(Rater::default().params().sample_rate, 16_000);
        assert_eq!(Rater::new(RatingConfig::narrowband()).params().sample_rate, 8_000);
    }

    #[test]
    fn config_parses_partial_json() {
        let c = RatingConfig::from_json_str(r#"{ "bandwidth": "narrowband" }"#).unwrap();
        assert_eq!(c.bandwidth, Bandwidth::Narrowband);
        assert_eq!(c.score_offset, 0.5);

        let c = RatingConfig::from_json_str(r#"{ "scoreOffset": 0.0 }"#).unwrap();
        assert_eq!(c.bandwidth, Bandwidth::Wideband);
        assert_eq!(c.score_offset, 0.0);

        assert!(matches!(
            RatingConfig::from_json_str(r#"{ "bandwidth": "fullband" }"#),
            Err(RatingError::Config(_))
        ));
    }

    #[test]
    fn empty_input_is_too_short() {
        let rater = Rater::default();
        assert!(matches!(
            rater.rate(&[], &[0.0; 32_000]),
            Err(RatingError::InputTooShort { .. })
        ));
    }
}

//! Serializable rating results.

use serde::{Deserialize, Serialize};

use crate::{engine::RatingContext, params::Bandwidth};

/// Result of one rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingReport {
    /// Final score in `[1.0, 5.0]`.
    pub score: f32,
    /// Unclamped model output, before the score offset.
    pub raw_score: f32,
    /// Pooled symmetric disturbance.
    pub d_indicator: f32,
    /// Pooled asymmetric disturbance.
    pub a_indicator: f32,
    /// Whole-signal coarse delay in samples.
    pub crude_delay: i64,
    pub bandwidth: Bandwidth,
    pub sample_rate: u32,
    pub pieces: Vec<PieceReport>,
}

/// Alignment of one speech piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceReport {
    /// First VAD window of the piece on the reference track.
    pub start: i64,
    /// VAD window where the piece ends.
    pub end: i64,
    /// Delay of the degraded track in samples; positive means late.
    pub delay: i64,
    pub delay_ms: f64,
    /// Fine-alignment histogram peak in `[0, 1]`.
    pub confidence: f32,
}

impl RatingReport {
    pub fn from_context(ctx: &RatingContext, score: f32) -> Self {
        let p = &ctx.params;
        Self {
            score,
            raw_score: ctx.rate,
            d_indicator: ctx.d_indicator,
            a_indicator: ctx.a_indicator,
            crude_delay: ctx.crude_delay,
            bandwidth: p.bandwidth,
            sample_rate: p.sample_rate,
            pieces: ctx
                .pieces
                .iter()
                .map(|piece| PieceReport {
                    start: piece.start,
                    end: piece.end,
                    delay: piece.delay,
                    delay_ms: p.samples_to_ms(piece.delay),
                    confidence: piece.confidence,
                })
                .collect(),
        }
    }
}

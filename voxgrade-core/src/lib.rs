//! # voxgrade-core
//!
//! Perceptual speech-quality rating engine (ITU-T P.862 style).
//!
//! ## Architecture
//!
//! ```text
//! WAV files → audio::load_for_rating → RatingContext
//!                                          │
//!                          level normalization + IRS filter
//!                                          │
//!                         input filter → energy VAD → crude delay
//!                                          │
//!                      pieces → fine align → split at delay jumps
//!                                          │
//!                 Bark spectra → disturbance → Lp/Lq pooling
//!                                          │
//!                                    RatingReport
//! ```
//!
//! Every rating owns its own [`engine::RatingContext`]; nothing is global,
//! so independent ratings can run on separate threads.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![cfg_attr(test, deny(unsafe_code))]
#![warn(clippy::all)]

pub mod align;
pub mod audio;
pub mod buffering;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod model;
pub mod params;
pub mod preprocess;
pub mod report;
pub mod segment;
pub mod vad;

// Convenience re-exports for downstream crates
pub use engine::{Rater, RatingConfig};
pub use error::{RatingError, Track};
pub use params::{Bandwidth, ModelParams};
pub use report::{PieceReport, RatingReport};

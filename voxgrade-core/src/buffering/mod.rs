//! Sample containers used across the rating pipeline.
//!
//! `Signal` is the value-typed track buffer; `AlignArena` is the scratch space
//! reused by every alignment sweep.

pub mod arena;
pub mod signal;

pub use arena::{AlignArena, AlignRegions};
pub use signal::Signal;

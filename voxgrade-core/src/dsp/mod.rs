//! Signal-processing primitives shared by every stage.

pub mod fft;
pub mod iir;

pub use fft::{next_pow2, FftContext};
pub use iir::apply_sos_cascade;

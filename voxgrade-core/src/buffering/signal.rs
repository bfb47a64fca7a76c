//! Owned, fixed-length mono sample container.

use std::ops::{Index, IndexMut};

/// A fixed-length block of single-precision samples.
///
/// Copies are always explicit (`clone`, [`Signal::resized`], [`Signal::window`]);
/// two `Signal`s never share storage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signal {
    samples: Vec<f32>,
}

impl Signal {
    /// A signal of `len` zero samples.
    pub fn zeros(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
        }
    }

    /// Take ownership of `samples` and zero-extend (or truncate) to `len`.
    pub fn from_samples(mut samples: Vec<f32>, len: usize) -> Self {
        samples.resize(len, 0.0);
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Independent copy truncated or zero-extended to `new_len`.
    pub fn resized(&self, new_len: usize) -> Signal {
        let keep = new_len.min(self.samples.len());
        let mut samples = Vec::with_capacity(new_len);
        samples.extend_from_slice(&self.samples[..keep]);
        samples.resize(new_len, 0.0);
        Signal { samples }
    }

    /// Copy of `len` samples starting at `start`; positions outside the
    /// signal (including negative ones) read as zero.
    pub fn window(&self, start: i64, len: usize) -> Signal {
        let mut out = vec![0.0f32; len];
        for (i, slot) in out.iter_mut().enumerate() {
            let pos = start + i as i64;
            if pos >= 0 && (pos as usize) < self.samples.len() {
                *slot = self.samples[pos as usize];
            }
        }
        Signal { samples: out }
    }

    /// Sample at `pos`, or zero when `pos` is out of range.
    pub fn get_or_zero(&self, pos: i64) -> f32 {
        if pos < 0 {
            return 0.0;
        }
        self.samples.get(pos as usize).copied().unwrap_or(0.0)
    }
}

impl Index<usize> for Signal {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.samples[index]
    }
}

impl IndexMut<usize> for Signal {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.samples[index]
    }
}

impl From<Vec<f32>> for Signal {
    fn from(samples: Vec<f32>) -> Self {
        Self { samples }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resized_copies_and_pads() {
        let s = Signal::from(vec![1.0, 2.0, 3.0]);
        let longer = s.resized(5);
        assert_eq!(longer.as_slice(), &[1.0, 2.0, 3.0, 0.0, 0.0]);
        let shorter = s.resized(2);
        assert_eq!(shorter.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn copies_do_not_alias() {
        let original = Signal::from(vec![1.0, 2.0]);
        let mut copy = original.clone();
        copy[0] = 9.0;
        assert_eq!(original[0], 1.0);
    }

    #[test]
    fn window_zero_pads_both_sides() {
        let s = Signal::from(vec![1.0, 2.0, 3.0]);
        let w = s.window(-2, 7);
        assert_eq!(w.as_slice(), &[0.0, 0.0, 1.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn from_samples_pads_to_length() {
        let s = Signal::from_samples(vec![0.5; 4], 10);
        assert_eq!(s.len(), 10);
        assert_eq!(s[3], 0.5);
        assert_eq!(s[4], 0.0);
    }
}

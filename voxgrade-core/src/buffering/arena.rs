//! Scratch arena for the alignment sweeps.
//!
//! One allocation, carved into named non-overlapping regions:
//!
//! ```text
//! | x1 (N+2) | x2 (N+2) | hist (N) | window (N) |
//! ```
//!
//! `x1`/`x2` hold packed half-spectra, so they carry two extra floats for the
//! Nyquist bin.

/// Offset/length of one region inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: usize,
    pub len: usize,
}

impl Region {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Mutable views of every region at once.
pub struct AlignRegions<'a> {
    pub x1: &'a mut [f32],
    pub x2: &'a mut [f32],
    pub hist: &'a mut [f32],
    pub window: &'a mut [f32],
}

#[derive(Debug, Clone)]
pub struct AlignArena {
    nfft: usize,
    buf: Vec<f32>,
}

impl AlignArena {
    /// Allocate an arena for frames of `nfft` samples and fill the window
    /// region with a Hann window.
    pub fn new(nfft: usize) -> Self {
        let mut arena = Self {
            nfft,
            buf: vec![0.0; Self::layout(nfft).3.end()],
        };
        let window = arena.regions().window;
        for (n, w) in window.iter_mut().enumerate() {
            *w = (0.5 * (1.0 - (std::f64::consts::TAU * n as f64 / nfft as f64).cos())) as f32;
        }
        arena
    }

    pub fn nfft(&self) -> usize {
        self.nfft
    }

    fn layout(nfft: usize) -> (Region, Region, Region, Region) {
        let x1 = Region {
            offset: 0,
            len: nfft + 2,
        };
        let x2 = Region {
            offset: x1.end(),
            len: nfft + 2,
        };
        let hist = Region {
            offset: x2.end(),
            len: nfft,
        };
        let window = Region {
            offset: hist.end(),
            len: nfft,
        };
        (x1, x2, hist, window)
    }

    /// Split the arena into its named regions.
    pub fn regions(&mut self) -> AlignRegions<'_> {
        let (x1, x2, hist, window) = Self::layout(self.nfft);
        let (head, rest) = self.buf.split_at_mut(x2.offset);
        let (x2_buf, rest) = rest.split_at_mut(x2.len);
        let (hist_buf, window_buf) = rest.split_at_mut(hist.len);
        debug_assert_eq!(head.len(), x1.len);
        debug_assert_eq!(window_buf.len(), window.len);
        AlignRegions {
            x1: head,
            x2: x2_buf,
            hist: hist_buf,
            window: window_buf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_have_expected_sizes() {
        let mut arena = AlignArena::new(64);
        let r = arena.regions();
        assert_eq!(r.x1.len(), 66);
        assert_eq!(r.x2.len(), 66);
        assert_eq!(r.hist.len(), 64);
        assert_eq!(r.window.len(), 64);
    }

    #[test]
    fn regions_do_not_overlap() {
        let mut arena = AlignArena::new(16);
        {
            let r = arena.regions();
            r.x1.fill(1.0);
            r.x2.fill(2.0);
            r.hist.fill(3.0);
        }
        let r = arena.regions();
        assert!(r.x1.iter().all(|&v| v == 1.0));
        assert!(r.x2.iter().all(|&v| v == 2.0));
        assert!(r.hist.iter().all(|&v| v == 3.0));
        // window keeps its Hann shape
        assert_eq!(r.window[0], 0.0);
        assert!((r.window[8] - 1.0).abs() < 1e-6);
    }
}

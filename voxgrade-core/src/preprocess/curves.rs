//! Piecewise-linear frequency-response curves in dB.

/// Response curve given as `(frequency Hz, gain dB)` knots in ascending
/// frequency order.
#[derive(Debug, Clone, Copy)]
pub struct ResponseCurve {
    points: &'static [[f64; 2]],
}

impl ResponseCurve {
    /// # Panics
    /// In debug builds, if fewer than two knots are given.
    pub const fn new(points: &'static [[f64; 2]]) -> Self {
        debug_assert!(points.len() >= 2);
        Self { points }
    }

    pub fn points(&self) -> &[[f64; 2]] {
        self.points
    }

    /// Gain in dB at `freq`. Outside the knot range the first/last segment
    /// is extended linearly.
    pub fn gain_db(&self, freq: f64) -> f64 {
        let pts = self.points;
        let last = pts.len() - 1;
        let seg = if freq <= pts[0][0] {
            1
        } else if freq >= pts[last][0] {
            last
        } else {
            pts.iter().position(|p| p[0] >= freq).unwrap_or(last).max(1)
        };
        let [f_lo, g_lo] = pts[seg - 1];
        let [f_hi, g_hi] = pts[seg];
        ((freq - f_lo) * g_hi + (f_hi - freq) * g_lo) / (f_hi - f_lo)
    }

    /// Linear gain at `freq` relative to the gain at 1 kHz.
    pub fn relative_gain(&self, freq: f64) -> f32 {
        let db = self.gain_db(freq) - self.gain_db(1000.0);
        10f64.powf(db / 20.0) as f32
    }
}

/// Band-pass used only for level measurement: 350 Hz to 3.25 kHz flat,
/// everything else 500 dB down.
pub static ALIGN_FILTER: ResponseCurve = ResponseCurve::new(&[
    [0., -500.],
    [50., -500.],
    [100., -500.],
    [125., -500.],
    [160., -500.],
    [200., -500.],
    [250., -500.],
    [300., -500.],
    [350., 0.],
    [400., 0.],
    [500., 0.],
    [600., 0.],
    [630., 0.],
    [800., 0.],
    [1000., 0.],
    [1250., 0.],
    [1600., 0.],
    [2000., 0.],
    [2500., 0.],
    [3000., 0.],
    [3250., 0.],
    [3500., -500.],
    [4000., -500.],
    [5000., -500.],
    [6300., -500.],
    [8000., -500.],
]);

/// Standard IRS send characteristic.
pub static IRS_FILTER: ResponseCurve = ResponseCurve::new(&[
    [0., -200.],
    [50., -40.],
    [100., -20.],
    [125., -12.],
    [160., -6.],
    [200., 0.],
    [250., 4.],
    [300., 6.],
    [350., 8.],
    [400., 10.],
    [500., 11.],
    [600., 12.],
    [700., 12.],
    [800., 12.],
    [1000., 12.],
    [1300., 12.],
    [1600., 12.],
    [2000., 12.],
    [2500., 12.],
    [3000., 12.],
    [3250., 12.],
    [3500., 4.],
    [4000., -200.],
    [5000., -200.],
    [6300., -200.],
    [8000., -200.],
]);

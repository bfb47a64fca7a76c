//! Published P.862 constant tables.
//!
//! The 8 kHz and 16 kHz Bark tables share their first 41 bands (same
//! 31.25 Hz FFT bin width); they differ only in the top band(s).

/// Bark-band layout and scaling for one working rate.
///
/// The shared per-band columns are stored at full wideband length and cut
/// to `bands` on access.
#[derive(Debug)]
pub struct BarkTable {
    bands: usize,
    /// Number of Hz bins summed into each Bark band. Sums to `Nf / 2`.
    hz_bins_per_band: &'static [usize],
    centre_bark: &'static [f64],
    width_bark: &'static [f64],
    pow_dens_correction: &'static [f64],
    abs_thresh_power: &'static [f64],
    /// Power scale applied after frequency warping.
    pub sp: f64,
    /// Loudness scale applied after intensity warping.
    pub sl: f64,
}

impl BarkTable {
    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn hz_bins_per_band(&self) -> &[usize] {
        &self.hz_bins_per_band[..self.bands]
    }

    pub fn centre_bark(&self) -> &[f64] {
        &self.centre_bark[..self.bands]
    }

    pub fn width_bark(&self) -> &[f64] {
        &self.width_bark[..self.bands]
    }

    pub fn pow_dens_correction(&self) -> &[f64] {
        &self.pow_dens_correction[..self.bands]
    }

    pub fn abs_thresh_power(&self) -> &[f64] {
        &self.abs_thresh_power[..self.bands]
    }
}

// ---------------------------------------------------------------------------
// Input IIR banks (b0, b1, b2, a1, a2) per second-order section
// ---------------------------------------------------------------------------

pub static INPUT_IIR_8K: [[f32; 5]; 8] = [
    [0.885535424, -0.885535424, 0.000000000, -0.771070709, 0.000000000],
    [0.895092588, 1.292907193, 0.449260174, 1.268869037, 0.442025372],
    [4.049527940, -7.865190042, 3.815662102, -1.746859852, 0.786305963],
    [0.500002353, -0.500002353, 0.000000000, 0.000000000, 0.000000000],
    [0.565002834, -0.241585934, -0.306009671, 0.259688659, 0.249979657],
    [2.115237288, 0.919935084, 1.141240051, -1.587313419, 0.665935315],
    [0.912224584, -0.224397719, -0.641121413, -0.246029464, -0.556720590],
    [0.444617727, -0.307589321, 0.141638062, -1.078798069, 0.463442016],
];

pub static INPUT_IIR_16K: [[f32; 5]; 12] = [
    [0.325631521, -0.086782860, -0.238848661, -1.079416490, 0.434583902],
    [0.403961804, -0.556985881, 0.153024077, -0.415115835, 0.696968046],
    [4.736162769, 3.287251046, 1.753289019, -1.859599046, 0.876284034],
    [0.365373469, 0.000000000, 0.000000000, -0.634626531, 0.000000000],
    [0.884811506, 0.000000000, 0.000000000, -0.256725271, 0.141536777],
    [0.723593055, -1.447186099, 0.723593044, -1.129587469, 0.657232737],
    [1.644910855, -1.817280902, 1.249658063, -1.778403899, 0.801724355],
    [0.633692689, -0.284644314, -0.319789663, 0.000000000, 0.000000000],
    [1.032763031, 0.268428979, 0.602913323, 0.000000000, 0.000000000],
    [1.001616361, -0.823749013, 0.439731942, -0.885778255, 0.000000000],
    [0.752472096, -0.375388990, 0.188977609, -0.077258216, 0.247230734],
    [1.019991280, 0.427332754, 0.521253075, -0.009151257, 0.014003791],
];

// ---------------------------------------------------------------------------
// Bark tables
// ---------------------------------------------------------------------------

static HZ_BINS_8K: [usize; 42] = [
    1, 1, 1, 1, 1, 1, 1, 1, 2, 1, //
    1, 1, 1, 1, 2, 1, 1, 2, 2, 2, //
    2, 2, 2, 2, 2, 3, 3, 3, 3, 4, //
    3, 4, 5, 4, 5, 6, 6, 7, 8, 9, //
    9, 11,
];

static HZ_BINS_16K: [usize; 49] = [
    1, 1, 1, 1, 1, 1, 1, 1, 2, 1, //
    1, 1, 1, 1, 2, 1, 1, 2, 2, 2, //
    2, 2, 2, 2, 2, 3, 3, 3, 3, 4, //
    3, 4, 5, 4, 5, 6, 6, 7, 8, 9, //
    9, 12, 12, 15, 16, 18, 21, 25, 20,
];

static CENTRE_BARK: [f64; 49] = [
    0.078672, 0.316341, 0.636559, 0.961246, 1.290450, //
    1.624217, 1.962597, 2.305636, 2.653383, 3.005889, //
    3.363201, 3.725371, 4.092449, 4.464486, 4.841533, //
    5.223642, 5.610866, 6.003256, 6.400869, 6.803755, //
    7.211971, 7.625571, 8.044611, 8.469146, 8.899232, //
    9.334927, 9.776288, 10.223374, 10.676242, 11.134952, //
    11.599563, 12.070135, 12.546731, 13.029408, 13.518232, //
    14.013264, 14.514566, 15.022202, 15.536238, 16.056736, //
    16.583761, 17.117382, 17.657663, 18.204674, 18.758478, //
    19.319147, 19.886751, 20.461355, 21.043034,
];

static WIDTH_BARK: [f64; 49] = [
    0.157344, 0.317994, 0.322441, 0.326934, 0.331474, //
    0.336061, 0.340697, 0.345381, 0.350114, 0.354897, //
    0.359729, 0.364611, 0.369544, 0.374529, 0.379565, //
    0.384653, 0.389794, 0.394989, 0.400236, 0.405538, //
    0.410894, 0.416306, 0.421773, 0.427297, 0.432877, //
    0.438514, 0.444209, 0.449962, 0.455774, 0.461645, //
    0.467577, 0.473569, 0.479621, 0.485736, 0.491912, //
    0.498151, 0.504454, 0.510819, 0.517250, 0.523745, //
    0.530308, 0.536934, 0.543629, 0.550390, 0.557220, //
    0.564119, 0.571085, 0.578125, 0.585232,
];

static POW_DENS_CORRECTION_8K: [f64; 42] = [
    100.000000, 99.999992, 100.000000, 100.000008, 100.000008, //
    100.000015, 99.999992, 99.999969, 50.000027, 100.000000, //
    99.999969, 100.000015, 99.999947, 100.000061, 53.047077, //
    110.000046, 117.991989, 65.000000, 68.760147, 69.999931, //
    71.428818, 75.000038, 76.843384, 80.968781, 88.646126, //
    63.864388, 68.155350, 72.547775, 75.584831, 58.379192, //
    80.950836, 64.135651, 54.384785, 73.821884, 64.437073, //
    59.176456, 65.521278, 61.399822, 58.144047, 57.004543, //
    64.126297, 59.248363,
];

static POW_DENS_CORRECTION_16K: [f64; 49] = [
    100.000000, 99.999992, 100.000000, 100.000008, 100.000008, //
    100.000015, 99.999992, 99.999969, 50.000027, 100.000000, //
    99.999969, 100.000015, 99.999947, 100.000061, 53.047077, //
    110.000046, 117.991989, 65.000000, 68.760147, 69.999931, //
    71.428818, 75.000038, 76.843384, 80.968781, 88.646126, //
    63.864388, 68.155350, 72.547775, 75.584831, 58.379192, //
    80.950836, 64.135651, 54.384785, 73.821884, 64.437073, //
    59.176456, 65.521278, 61.399822, 58.144047, 57.004543, //
    64.126297, 54.311001, 61.039532, 55.397049, 55.597637, //
    56.311604, 55.982174, 57.162071, 47.553688,
];

static ABS_THRESH_POWER: [f64; 49] = [
    51286152.00, 2454709.500, 70794.593750, 4897.788574, 1174.897705, //
    389.045166, 104.712860, 45.708820, 17.782795, 9.772372, //
    4.897789, 3.090296, 1.905461, 1.258925, 0.977237, //
    0.724436, 0.562341, 0.457088, 0.389045, 0.331131, //
    0.295121, 0.269153, 0.257040, 0.251189, 0.251189, //
    0.251189, 0.251189, 0.263027, 0.288403, 0.309029, //
    0.338844, 0.371535, 0.398107, 0.436516, 0.467735, //
    0.489779, 0.501187, 0.501187, 0.512861, 0.524807, //
    0.524807, 0.524807, 0.512861, 0.478630, 0.426580, //
    0.371535, 0.363078, 0.416869, 0.537032,
];

pub static BARK_8K: BarkTable = BarkTable {
    bands: 42,
    hz_bins_per_band: &HZ_BINS_8K,
    centre_bark: &CENTRE_BARK,
    width_bark: &WIDTH_BARK,
    pow_dens_correction: &POW_DENS_CORRECTION_8K,
    abs_thresh_power: &ABS_THRESH_POWER,
    sp: 2.764344e-5,
    sl: 1.866055e-1,
};

pub static BARK_16K: BarkTable = BarkTable {
    bands: 49,
    hz_bins_per_band: &HZ_BINS_16K,
    centre_bark: &CENTRE_BARK,
    width_bark: &WIDTH_BARK,
    pow_dens_correction: &POW_DENS_CORRECTION_16K,
    abs_thresh_power: &ABS_THRESH_POWER,
    sp: 6.910853e-6,
    sl: 1.866055e-1,
};

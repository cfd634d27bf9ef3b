//! Vocal tremor estimate from low-frequency modulation of the pitch contour.
//!
//! The voiced F0 sequence is mean-subtracted and transformed as if it were
//! uniformly sampled at the frame rate of 100 Hz; the reported value is the
//! largest spectral magnitude inside the physiological tremor band. Gaps
//! left by unvoiced frames are ignored rather than resampled, so the
//! effective sampling is only approximately uniform.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::features::FeatureSet;

/// Assumed sampling rate of the voiced F0 sequence, one frame per 10 ms.
const CONTOUR_RATE_HZ: f64 = 100.0;

#[derive(Debug, Clone, Copy)]
pub struct TremorParams {
    pub band_low_hz: f64,
    pub band_high_hz: f64,
    /// Minimum number of voiced frames for a usable spectrum.
    pub min_voiced_frames: usize,
}

impl Default for TremorParams {
    fn default() -> Self {
        Self {
            band_low_hz: 1.5,
            band_high_hz: 15.0,
            min_voiced_frames: 30,
        }
    }
}

/// Compute `vocal_tremor` from the voiced F0 values of a contour.
pub fn analyze(voiced_f0: &[f64], params: &TremorParams) -> FeatureSet {
    let mut set = FeatureSet::new();
    set.insert("vocal_tremor", tremor_magnitude(voiced_f0, params));
    set
}

fn tremor_magnitude(voiced_f0: &[f64], params: &TremorParams) -> Option<f64> {
    let n = voiced_f0.len();
    if n <= params.min_voiced_frames {
        return None;
    }

    let mean = voiced_f0.iter().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex<f64>> = voiced_f0
        .iter()
        .map(|&f| Complex::new(f - mean, 0.0))
        .collect();

    let fft = FftPlanner::new().plan_fft_forward(n);
    fft.process(&mut buffer);

    // Positive-frequency bins only; bin k sits at k * rate / n Hz.
    let bin_hz = CONTOUR_RATE_HZ / n as f64;
    buffer
        .iter()
        .take(n / 2 + 1)
        .enumerate()
        .filter(|(k, _)| {
            let freq = *k as f64 * bin_hz;
            freq >= params.band_low_hz && freq <= params.band_high_hz
        })
        .map(|(_, c)| c.norm())
        .fold(None, |best: Option<f64>, magnitude| match best {
            Some(b) if b >= magnitude => Some(b),
            _ => Some(magnitude),
        })
}

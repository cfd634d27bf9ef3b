//! Acoustic analysis toolkit
//!
//! The analyzers never run DSP themselves; they consume the derived acoustic
//! structures produced here. The [`AcousticToolkit`] trait is the seam: the
//! production backend ([`DspToolkit`]) does the signal processing in-crate,
//! and pipeline tests substitute a hand-built fake.
//!
//! ## Structures
//!
//! - [`Waveform`] - mono f32 samples + sample rate, scoped to one file
//! - [`PitchContour`] - (time, frequency) every 10 ms; 0 Hz marks unvoiced
//! - [`PointProcess`] - strictly increasing glottal pulse instants
//! - [`FormantGrid`] - per-frame formant (frequency, bandwidth) candidates,
//!   queried by time with linear interpolation

pub mod formant;
pub mod pitch;
pub mod pulses;

use crate::error::ExtractError;

/// Mono waveform, immutable for the lifetime of one extraction.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Total duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Pitch search parameters (floor/ceiling in Hz, frame step in seconds).
#[derive(Debug, Clone, Copy)]
pub struct PitchParams {
    pub floor_hz: f64,
    pub ceiling_hz: f64,
    pub time_step_s: f64,
}

impl Default for PitchParams {
    fn default() -> Self {
        Self {
            floor_hz: 75.0,
            ceiling_hz: 500.0,
            time_step_s: 0.01,
        }
    }
}

/// Formant estimation parameters.
#[derive(Debug, Clone, Copy)]
pub struct FormantParams {
    pub time_step_s: f64,
    pub max_formants: usize,
    pub ceiling_hz: f64,
    pub window_s: f64,
    pub pre_emphasis_hz: f64,
}

impl Default for FormantParams {
    fn default() -> Self {
        Self {
            time_step_s: 0.01,
            max_formants: 5,
            ceiling_hz: 5500.0,
            window_s: 0.025,
            pre_emphasis_hz: 50.0,
        }
    }
}

/// Pitch contour at a fixed frame step. A frequency of 0 Hz marks an
/// unvoiced frame; the voiced subset is everything nonzero.
#[derive(Debug, Clone)]
pub struct PitchContour {
    pub times: Vec<f64>,
    pub frequencies: Vec<f64>,
    pub time_step_s: f64,
}

impl PitchContour {
    /// Frequencies of voiced frames only, in frame order.
    pub fn voiced(&self) -> Vec<f64> {
        self.frequencies.iter().copied().filter(|&f| f > 0.0).collect()
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

/// Sequence of glottal pulse instants in seconds, strictly increasing.
#[derive(Debug, Clone)]
pub struct PointProcess {
    pub times: Vec<f64>,
}

impl PointProcess {
    /// Inter-pulse periods, one fewer than the pulse count.
    pub fn periods(&self) -> Vec<f64> {
        self.times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn pulse_count(&self) -> usize {
        self.times.len()
    }
}

/// One formant candidate at one analysis frame.
#[derive(Debug, Clone, Copy)]
pub struct FormantPoint {
    pub frequency_hz: f64,
    pub bandwidth_hz: f64,
}

/// Formant trajectories sampled at a fixed frame step.
///
/// Each frame holds the formant candidates found there, ascending by
/// frequency; a frame may hold fewer candidates than `max_formants`.
/// Time queries interpolate linearly between the two surrounding frames,
/// falling back to the nearer frame when only one side has the requested
/// formant index.
#[derive(Debug, Clone, Default)]
pub struct FormantGrid {
    pub times: Vec<f64>,
    pub frames: Vec<Vec<FormantPoint>>,
}

impl FormantGrid {
    /// Frequency of formant `index` (1-based) at time `t`, if estimable.
    pub fn frequency_at(&self, index: usize, t: f64) -> Option<f64> {
        self.query(index, t, |p| p.frequency_hz)
    }

    /// Bandwidth of formant `index` (1-based) at time `t`, if estimable.
    pub fn bandwidth_at(&self, index: usize, t: f64) -> Option<f64> {
        self.query(index, t, |p| p.bandwidth_hz)
    }

    fn query(&self, index: usize, t: f64, field: impl Fn(&FormantPoint) -> f64) -> Option<f64> {
        if index == 0 || self.times.is_empty() {
            return None;
        }

        // Surrounding frame pair by time; clamp outside the sampled range.
        let after = self.times.partition_point(|&ft| ft < t);
        let (lo, hi) = match after {
            0 => (0, 0),
            n if n >= self.times.len() => (self.times.len() - 1, self.times.len() - 1),
            n => (n - 1, n),
        };

        let lo_val = self.frames[lo].get(index - 1).map(&field);
        let hi_val = self.frames[hi].get(index - 1).map(&field);

        match (lo_val, hi_val) {
            (Some(a), Some(b)) => {
                let span = self.times[hi] - self.times[lo];
                if span <= 0.0 {
                    Some(a)
                } else {
                    let frac = (t - self.times[lo]) / span;
                    Some(a + frac * (b - a))
                }
            }
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

/// Capability set the extraction pipeline consumes.
///
/// Implementations must be side-effect-free per call so that pipeline runs
/// for different files can proceed independently.
pub trait AcousticToolkit: Send + Sync {
    fn pitch_contour(
        &self,
        wave: &Waveform,
        params: &PitchParams,
    ) -> Result<PitchContour, ExtractError>;

    fn point_process(
        &self,
        wave: &Waveform,
        params: &PitchParams,
    ) -> Result<PointProcess, ExtractError>;

    fn formant_grid(
        &self,
        wave: &Waveform,
        params: &FormantParams,
    ) -> Result<FormantGrid, ExtractError>;
}

/// Production DSP backend.
#[derive(Debug, Default)]
pub struct DspToolkit;

impl AcousticToolkit for DspToolkit {
    fn pitch_contour(
        &self,
        wave: &Waveform,
        params: &PitchParams,
    ) -> Result<PitchContour, ExtractError> {
        pitch::track_pitch(wave, params)
    }

    fn point_process(
        &self,
        wave: &Waveform,
        params: &PitchParams,
    ) -> Result<PointProcess, ExtractError> {
        let contour = pitch::track_pitch(wave, params)?;
        pulses::detect_pulses(wave, &contour)
    }

    fn formant_grid(
        &self,
        wave: &Waveform,
        params: &FormantParams,
    ) -> Result<FormantGrid, ExtractError> {
        formant::estimate_formants(wave, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_duration() {
        let wave = Waveform::new(vec![0.0; 16000], 16000);
        assert!((wave.duration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_contour_voiced_subset() {
        let contour = PitchContour {
            times: vec![0.0, 0.01, 0.02, 0.03],
            frequencies: vec![0.0, 120.0, 0.0, 130.0],
            time_step_s: 0.01,
        };
        assert_eq!(contour.voiced(), vec![120.0, 130.0]);
    }

    #[test]
    fn test_point_process_periods() {
        let pp = PointProcess {
            times: vec![0.0, 0.01, 0.021],
        };
        let periods = pp.periods();
        assert_eq!(periods.len(), 2);
        assert!((periods[0] - 0.01).abs() < 1e-12);
        assert!((periods[1] - 0.011).abs() < 1e-12);
    }

    #[test]
    fn test_formant_grid_interpolation() {
        let grid = FormantGrid {
            times: vec![0.0, 0.01],
            frames: vec![
                vec![FormantPoint {
                    frequency_hz: 500.0,
                    bandwidth_hz: 80.0,
                }],
                vec![FormantPoint {
                    frequency_hz: 600.0,
                    bandwidth_hz: 100.0,
                }],
            ],
        };
        let f = grid.frequency_at(1, 0.005).unwrap();
        assert!((f - 550.0).abs() < 1e-9);
        let b = grid.bandwidth_at(1, 0.005).unwrap();
        assert!((b - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_formant_grid_clamps_outside_range() {
        let grid = FormantGrid {
            times: vec![0.01],
            frames: vec![vec![FormantPoint {
                frequency_hz: 500.0,
                bandwidth_hz: 80.0,
            }]],
        };
        assert_eq!(grid.frequency_at(1, 0.5), Some(500.0));
        assert_eq!(grid.frequency_at(2, 0.01), None);
    }

    #[test]
    fn test_formant_grid_empty() {
        let grid = FormantGrid::default();
        assert_eq!(grid.frequency_at(1, 0.0), None);
    }
}

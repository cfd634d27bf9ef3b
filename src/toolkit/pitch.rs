//! Pitch contour tracking
//!
//! McLeod pitch method over overlapping frames at the configured step.
//! Candidates outside the floor/ceiling search range count as unvoiced, so
//! the contour keeps a fixed frame grid with 0 Hz holes.

use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;

use super::{PitchContour, PitchParams, Waveform};
use crate::error::ExtractError;

/// Power threshold for pitch candidate acceptance
const POWER_THRESHOLD: f64 = 0.8;

/// Clarity threshold for pitch candidate acceptance
const CLARITY_THRESHOLD: f64 = 0.5;

/// Analysis window must cover three periods of the pitch floor.
const PERIODS_PER_WINDOW: f64 = 3.0;

/// Track the pitch contour of a waveform.
///
/// Frames step by `params.time_step_s`; each frame is timestamped at its
/// center. A waveform shorter than one analysis window yields an empty
/// contour, which downstream analyzers treat as "no voiced frames".
pub fn track_pitch(wave: &Waveform, params: &PitchParams) -> Result<PitchContour, ExtractError> {
    if params.floor_hz <= 0.0 || params.ceiling_hz <= params.floor_hz {
        return Err(ExtractError::Toolkit(format!(
            "invalid pitch search range {}-{} Hz",
            params.floor_hz, params.ceiling_hz
        )));
    }

    let sr = wave.sample_rate as usize;
    let window = (PERIODS_PER_WINDOW / params.floor_hz * sr as f64).ceil() as usize;
    let frame_size = window.next_power_of_two();
    let hop = (params.time_step_s * sr as f64).round().max(1.0) as usize;

    let mut times = Vec::new();
    let mut frequencies = Vec::new();

    if wave.samples.len() >= frame_size {
        let mut detector = McLeodDetector::new(frame_size, frame_size / 2);
        let mut frame = vec![0.0f64; frame_size];

        let mut start = 0;
        while start + frame_size <= wave.samples.len() {
            for (dst, src) in frame.iter_mut().zip(&wave.samples[start..start + frame_size]) {
                *dst = *src as f64;
            }

            let freq = detector
                .get_pitch(&frame, sr, POWER_THRESHOLD, CLARITY_THRESHOLD)
                .map(|p| p.frequency)
                .filter(|&f| f >= params.floor_hz && f <= params.ceiling_hz)
                .unwrap_or(0.0);

            times.push((start + frame_size / 2) as f64 / sr as f64);
            frequencies.push(freq);
            start += hop;
        }
    }

    Ok(PitchContour {
        times,
        frequencies,
        time_step_s: params.time_step_s,
    })
}

//! Glottal pulse detection
//!
//! Period-synchronous peak picking seeded from the pitch contour: within each
//! voiced region the detector walks forward one local period at a time and
//! snaps every pulse to the waveform maximum near the predicted instant. The
//! result is a strictly increasing point process suitable for period-based
//! jitter metrics.

use super::{PitchContour, PointProcess, Waveform};
use crate::error::ExtractError;

/// Search half-width around the predicted pulse, as a fraction of the period.
const SEARCH_FRACTION: f64 = 0.2;

/// Detect glottal pulse instants from a waveform and its pitch contour.
pub fn detect_pulses(
    wave: &Waveform,
    contour: &PitchContour,
) -> Result<PointProcess, ExtractError> {
    let sr = wave.sample_rate as f64;
    let mut times: Vec<f64> = Vec::new();

    let mut frame = 0;
    while frame < contour.len() {
        // Skip to the next voiced region.
        if contour.frequencies[frame] <= 0.0 {
            frame += 1;
            continue;
        }

        let region_start = contour.times[frame];
        let mut t = region_start;
        let mut first = true;

        // Walk the region pulse by pulse until voicing ends.
        loop {
            let freq = frequency_near(contour, t);
            if freq <= 0.0 {
                break;
            }
            let period = 1.0 / freq;

            let center = if first { t } else { t + period };
            if center >= wave.samples.len() as f64 / sr {
                break;
            }

            let lo = center - SEARCH_FRACTION * period;
            let hi = center + SEARCH_FRACTION * period;
            match peak_in_window(wave, lo, hi) {
                Some(peak_t) if times.last().map_or(true, |&last| peak_t > last) => {
                    times.push(peak_t);
                    t = peak_t;
                }
                // No usable peak; advance by one predicted period anyway so
                // the walk always makes progress.
                _ => t = center.max(t + period),
            }
            first = false;
        }

        // Resume scanning after the region we just walked.
        while frame < contour.len() && contour.times[frame] <= t {
            frame += 1;
        }
    }

    Ok(PointProcess { times })
}

/// Pitch at the contour frame nearest to `t`, 0.0 when unvoiced or outside.
fn frequency_near(contour: &PitchContour, t: f64) -> f64 {
    if contour.is_empty() {
        return 0.0;
    }
    let after = contour.times.partition_point(|&ft| ft < t);
    let idx = if after == 0 {
        0
    } else if after >= contour.times.len() {
        contour.times.len() - 1
    } else if (contour.times[after] - t) < (t - contour.times[after - 1]) {
        after
    } else {
        after - 1
    };
    // Beyond half a step from the nearest frame means outside the contour.
    if (contour.times[idx] - t).abs() > contour.time_step_s {
        return 0.0;
    }
    contour.frequencies[idx]
}

/// Time of the maximum sample in [lo, hi], or None for an empty window.
fn peak_in_window(wave: &Waveform, lo: f64, hi: f64) -> Option<f64> {
    let sr = wave.sample_rate as f64;
    let start = (lo * sr).floor().max(0.0) as usize;
    let end = ((hi * sr).ceil() as usize).min(wave.samples.len());
    if start >= end {
        return None;
    }

    let mut best = start;
    for i in start..end {
        if wave.samples[i] > wave.samples[best] {
            best = i;
        }
    }
    Some(best as f64 / sr)
}

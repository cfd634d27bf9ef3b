//! Formant frequency and bandwidth statistics for F1-F3.
//!
//! Samples the formant grid every 10 ms across the waveform duration and
//! aggregates frequency and bandwidth lists separately: a frame may
//! contribute a usable frequency but an unusable bandwidth, or the reverse.
//! Each formant index fails on its own; a bad F2 never touches F1 or F3.

use crate::features::FeatureSet;
use crate::toolkit::FormantGrid;

/// Sampling step along the trajectory, matching the analysis frame step.
const SAMPLE_STEP_S: f64 = 0.01;

/// Feature names per reported formant:
/// (frequency mean, frequency sd, bandwidth mean, bandwidth sd).
const FORMANT_FEATURES: [(usize, [&str; 4]); 3] = [
    (1, ["f1_frequency_mean", "f1_frequency_sd", "f1_bandwidth_mean", "f1_bandwidth_sd"]),
    (2, ["f2_frequency_mean", "f2_frequency_sd", "f2_bandwidth_mean", "f2_bandwidth_sd"]),
    (3, ["f3_frequency_mean", "f3_frequency_sd", "f3_bandwidth_mean", "f3_bandwidth_sd"]),
];

/// Compute the 12 formant features from a grid and the waveform duration.
pub fn analyze(grid: &FormantGrid, duration_s: f64) -> FeatureSet {
    let mut set = FeatureSet::new();

    for (index, [freq_mean, freq_sd, bw_mean, bw_sd]) in FORMANT_FEATURES {
        let mut frequencies = Vec::new();
        let mut bandwidths = Vec::new();

        let mut t = SAMPLE_STEP_S;
        while t < duration_s {
            if let Some(f) = grid.frequency_at(index, t) {
                if f.is_finite() && f > 0.0 {
                    frequencies.push(f);
                }
            }
            if let Some(b) = grid.bandwidth_at(index, t) {
                if b.is_finite() && b > 0.0 {
                    bandwidths.push(b);
                }
            }
            t += SAMPLE_STEP_S;
        }

        insert_stats(&mut set, freq_mean, freq_sd, &frequencies);
        insert_stats(&mut set, bw_mean, bw_sd, &bandwidths);
    }

    set
}

fn insert_stats(
    set: &mut FeatureSet,
    mean_name: &'static str,
    sd_name: &'static str,
    values: &[f64],
) {
    if values.is_empty() {
        set.insert(mean_name, None);
        set.insert(sd_name, None);
        return;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    set.insert(mean_name, Some(mean));
    set.insert(sd_name, Some(sd));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::FormantPoint;

    /// Grid with constant formants at every 10 ms frame.
    fn constant_grid(frames: usize, formants: &[(f64, f64)]) -> FormantGrid {
        let times = (0..frames).map(|i| i as f64 * 0.01).collect();
        let frame: Vec<FormantPoint> = formants
            .iter()
            .map(|&(frequency_hz, bandwidth_hz)| FormantPoint {
                frequency_hz,
                bandwidth_hz,
            })
            .collect();
        FormantGrid {
            times,
            frames: vec![frame; frames],
        }
    }

    #[test]
    fn test_constant_formants() {
        let grid = constant_grid(100, &[(700.0, 80.0), (1200.0, 120.0), (2600.0, 200.0)]);
        let set = analyze(&grid, 1.0);

        assert_eq!(set.len(), 12);
        assert!((set.get("f1_frequency_mean").unwrap() - 700.0).abs() < 1e-9);
        assert!((set.get("f2_frequency_mean").unwrap() - 1200.0).abs() < 1e-9);
        assert!((set.get("f3_frequency_mean").unwrap() - 2600.0).abs() < 1e-9);
        assert!(set.get("f1_frequency_sd").unwrap().abs() < 1e-9);
        assert!((set.get("f2_bandwidth_mean").unwrap() - 120.0).abs() < 1e-9);
        assert!(set.get("f3_bandwidth_sd").unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_missing_higher_formants_do_not_affect_lower() {
        // Only F1 present in every frame.
        let grid = constant_grid(50, &[(650.0, 90.0)]);
        let set = analyze(&grid, 0.5);

        assert!(set.get("f1_frequency_mean").is_some());
        assert!(set.get("f1_bandwidth_mean").is_some());
        for name in [
            "f2_frequency_mean",
            "f2_frequency_sd",
            "f2_bandwidth_mean",
            "f2_bandwidth_sd",
            "f3_frequency_mean",
            "f3_frequency_sd",
            "f3_bandwidth_mean",
            "f3_bandwidth_sd",
        ] {
            assert_eq!(set.get(name), None, "{name} should be missing");
        }
    }

    #[test]
    fn test_invalid_bandwidth_keeps_valid_frequency() {
        // Negative bandwidths are filtered; frequencies still aggregate.
        let grid = constant_grid(50, &[(650.0, -5.0)]);
        let set = analyze(&grid, 0.5);

        assert!(set.get("f1_frequency_mean").is_some());
        assert_eq!(set.get("f1_bandwidth_mean"), None);
        assert_eq!(set.get("f1_bandwidth_sd"), None);
    }

    #[test]
    fn test_empty_grid_all_missing() {
        let set = analyze(&FormantGrid::default(), 1.0);
        assert_eq!(set.len(), 12);
        assert_eq!(set.get("f1_frequency_mean"), None);
        assert_eq!(set.get("f3_bandwidth_sd"), None);
    }

    #[test]
    fn test_zero_duration_all_missing() {
        let grid = constant_grid(10, &[(700.0, 80.0)]);
        let set = analyze(&grid, 0.0);
        assert_eq!(set.get("f1_frequency_mean"), None);
    }
}

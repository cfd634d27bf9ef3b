//! Pitch distribution statistics over the voiced frames of a contour.
//!
//! Owns 24 of the 43 features. All of them aggregate the voiced value
//! sequence V (unvoiced frames discarded):
//!
//! - basic statistics and ranges from |V| >= 1
//! - quartiles and percentiles by linear interpolation, plus their pairwise
//!   ranges
//! - skewness, excess kurtosis, coefficient of variation
//! - an ordinary-least-squares trend over the unit-step frame index
//!   (slope / offset / mean-squared residual), which needs |V| >= 2 and stays
//!   missing at |V| = 1 even though the other statistics compute

use crate::features::FeatureSet;
use crate::toolkit::PitchContour;

/// All 24 pitch feature names, used for the bulk missing fill.
const PITCH_FEATURES: [&str; 24] = [
    "pitch_mean",
    "pitch_std",
    "pitch_min",
    "pitch_max",
    "pitch_range",
    "f0_range",
    "pitch_first_quartile",
    "pitch_second_quartile",
    "pitch_third_quartile",
    "pitch_q2_q1_range",
    "pitch_q3_q1_range",
    "pitch_q3_q2_range",
    "pitch_percentile_1",
    "pitch_percentile_20",
    "pitch_percentile_80",
    "pitch_percentile_99",
    "pitch_percentile_1_99_range",
    "pitch_percentile_20_80_range",
    "pitch_skewness",
    "pitch_kurtosis",
    "pitch_coefficient_of_variation",
    "pitch_linear_regression_slope",
    "pitch_linear_regression_offset",
    "pitch_linear_regression_mse",
];

/// Compute the pitch feature subset from a contour.
pub fn analyze(contour: &PitchContour) -> FeatureSet {
    let values = contour.voiced();

    let mut set = FeatureSet::new();
    if values.is_empty() {
        for name in PITCH_FEATURES {
            set.insert(name, None);
        }
        return set;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = population_std(&values, mean);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    set.insert("pitch_mean", Some(mean));
    set.insert("pitch_std", Some(std));
    set.insert("pitch_min", Some(min));
    set.insert("pitch_max", Some(max));
    set.insert("pitch_range", Some(range));
    // F0 range is the same quantity for the voiced segment.
    set.insert("f0_range", Some(range));

    let mut sorted = values.clone();
    sorted.sort_by(f64::total_cmp);

    let q1 = percentile(&sorted, 25.0);
    let q2 = percentile(&sorted, 50.0);
    let q3 = percentile(&sorted, 75.0);
    set.insert("pitch_first_quartile", Some(q1));
    set.insert("pitch_second_quartile", Some(q2));
    set.insert("pitch_third_quartile", Some(q3));
    set.insert("pitch_q2_q1_range", Some(q2 - q1));
    set.insert("pitch_q3_q1_range", Some(q3 - q1));
    set.insert("pitch_q3_q2_range", Some(q3 - q2));

    let p1 = percentile(&sorted, 1.0);
    let p20 = percentile(&sorted, 20.0);
    let p80 = percentile(&sorted, 80.0);
    let p99 = percentile(&sorted, 99.0);
    set.insert("pitch_percentile_1", Some(p1));
    set.insert("pitch_percentile_20", Some(p20));
    set.insert("pitch_percentile_80", Some(p80));
    set.insert("pitch_percentile_99", Some(p99));
    set.insert("pitch_percentile_1_99_range", Some(p99 - p1));
    set.insert("pitch_percentile_20_80_range", Some(p80 - p20));

    set.insert("pitch_skewness", skewness(&values, mean));
    set.insert("pitch_kurtosis", excess_kurtosis(&values, mean));
    set.insert(
        "pitch_coefficient_of_variation",
        (mean != 0.0).then(|| std / mean),
    );

    let (slope, offset, mse) = match linear_regression(&values) {
        Some((s, o, m)) => (Some(s), Some(o), Some(m)),
        None => (None, None, None),
    };
    set.insert("pitch_linear_regression_slope", slope);
    set.insert("pitch_linear_regression_offset", offset);
    set.insert("pitch_linear_regression_mse", mse);

    set
}

fn population_std(values: &[f64], mean: f64) -> f64 {
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Linearly interpolated percentile over a pre-sorted slice, p in [0, 100].
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p / 100.0;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

/// Biased sample skewness (third standardized moment). Undefined for a
/// degenerate distribution.
fn skewness(values: &[f64], mean: f64) -> Option<f64> {
    let n = values.len() as f64;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    (m2 > 0.0).then(|| m3 / m2.powf(1.5))
}

/// Biased excess kurtosis (fourth standardized moment minus 3).
fn excess_kurtosis(values: &[f64], mean: f64) -> Option<f64> {
    let n = values.len() as f64;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let m4 = values.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / n;
    (m2 > 0.0).then(|| m4 / (m2 * m2) - 3.0)
}

/// OLS fit of value against the unit-step frame index 0..n-1.
/// Returns (slope, intercept, mean-squared residual); needs two points.
fn linear_regression(values: &[f64]) -> Option<(f64, f64, f64)> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let x_mean = (values.len() - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let mse = values
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let predicted = intercept + slope * i as f64;
            (y - predicted).powi(2)
        })
        .sum::<f64>()
        / n;

    Some((slope, intercept, mse))
}

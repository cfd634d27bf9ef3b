//! Jitter metrics over a glottal point process.
//!
//! Six period-perturbation metrics, each computed independently so that one
//! failing formula never blanks the others. Periods outside
//! [shortest, longest] and pairs whose ratio exceeds the maximum period
//! ratio are outliers and drop out of every formula.
//!
//! `jitter_local_sd` is not a measured statistic: it is the documented
//! 0.15 x local-jitter approximation and must stay that way.

use crate::features::FeatureSet;
use crate::toolkit::PointProcess;

/// Period filtering bounds shared by all six formulas.
#[derive(Debug, Clone, Copy)]
pub struct JitterParams {
    pub shortest_period_s: f64,
    pub longest_period_s: f64,
    pub max_period_ratio: f64,
}

impl Default for JitterParams {
    fn default() -> Self {
        Self {
            shortest_period_s: 0.0001,
            longest_period_s: 0.02,
            max_period_ratio: 1.3,
        }
    }
}

/// Approximation factor relating local jitter SD to its mean.
const LOCAL_SD_FACTOR: f64 = 0.15;

/// Compute all six jitter features from a point process.
pub fn analyze(pp: &PointProcess, params: &JitterParams) -> FeatureSet {
    let periods = pp.periods();

    let local = local_jitter(&periods, params);
    let rap = rap_jitter(&periods, params);

    let mut set = FeatureSet::new();
    set.insert("ddp_jitter", rap.map(|r| 3.0 * r));
    set.insert("jitter_local_mean", local);
    set.insert("jitter_local_sd", local.map(|j| j * LOCAL_SD_FACTOR));
    set.insert("local_absolute_jitter", local_absolute_jitter(&periods, params));
    set.insert("ppq5_jitter", ppq_jitter(&periods, params, 5));
    set.insert("rap_jitter", rap);
    set
}

fn valid(p: f64, params: &JitterParams) -> bool {
    p >= params.shortest_period_s && p <= params.longest_period_s
}

fn ratio_ok(a: f64, b: f64, params: &JitterParams) -> bool {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    lo > 0.0 && hi / lo <= params.max_period_ratio
}

/// Mean of periods surviving the [shortest, longest] filter.
fn mean_period(periods: &[f64], params: &JitterParams) -> Option<f64> {
    let kept: Vec<f64> = periods.iter().copied().filter(|&p| valid(p, params)).collect();
    if kept.is_empty() {
        return None;
    }
    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}

/// Mean absolute difference between consecutive periods, in seconds.
fn local_absolute_jitter(periods: &[f64], params: &JitterParams) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for w in periods.windows(2) {
        if valid(w[0], params) && valid(w[1], params) && ratio_ok(w[0], w[1], params) {
            sum += (w[1] - w[0]).abs();
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f64)
}

/// Local (relative) jitter: mean absolute consecutive difference over the
/// mean period.
fn local_jitter(periods: &[f64], params: &JitterParams) -> Option<f64> {
    let absolute = local_absolute_jitter(periods, params)?;
    let mean = mean_period(periods, params)?;
    (mean > 0.0).then(|| absolute / mean)
}

/// Relative average perturbation: each period against the mean of itself and
/// its two neighbours.
fn rap_jitter(periods: &[f64], params: &JitterParams) -> Option<f64> {
    ppq_jitter(periods, params, 3)
}

/// k-point period perturbation quotient (k odd): each period against the
/// mean of the window centered on it, normalized by the mean period.
fn ppq_jitter(periods: &[f64], params: &JitterParams, k: usize) -> Option<f64> {
    debug_assert!(k % 2 == 1);
    if periods.len() < k {
        return None;
    }

    let mut sum = 0.0;
    let mut count = 0usize;
    for window in periods.windows(k) {
        if !window.iter().all(|&p| valid(p, params)) {
            continue;
        }
        if !window.windows(2).all(|w| ratio_ok(w[0], w[1], params)) {
            continue;
        }
        let avg = window.iter().sum::<f64>() / k as f64;
        sum += (window[k / 2] - avg).abs();
        count += 1;
    }
    if count == 0 {
        return None;
    }

    let mean = mean_period(periods, params)?;
    (mean > 0.0).then(|| (sum / count as f64) / mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_train(periods: &[f64]) -> PointProcess {
        let mut t = 0.0;
        let mut times = vec![0.0];
        for &p in periods {
            t += p;
            times.push(t);
        }
        PointProcess { times }
    }

    #[test]
    fn test_uniform_train_has_negligible_jitter() {
        // Accumulating pulse times leaves ~1e-16 rounding in the periods,
        // so a uniform train measures near zero, not exactly zero.
        let pp = pulse_train(&[0.005; 20]);
        let set = analyze(&pp, &JitterParams::default());

        for name in [
            "jitter_local_mean",
            "jitter_local_sd",
            "local_absolute_jitter",
            "rap_jitter",
            "ppq5_jitter",
            "ddp_jitter",
        ] {
            let value = set.get(name).unwrap();
            assert!(value.abs() < 1e-12, "{name} should be ~0, got {value}");
        }
    }

    #[test]
    fn test_fewer_than_two_pulses_all_missing() {
        let pp = PointProcess { times: vec![0.1] };
        let set = analyze(&pp, &JitterParams::default());

        for name in [
            "ddp_jitter",
            "jitter_local_mean",
            "jitter_local_sd",
            "local_absolute_jitter",
            "ppq5_jitter",
            "rap_jitter",
        ] {
            assert_eq!(set.get(name), None, "{name} should be missing");
        }
        // Still six explicit entries, all missing.
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn test_alternating_periods_known_local_jitter() {
        // Periods alternate 9 ms / 11 ms: every consecutive difference is
        // 2 ms and the mean period is 10 ms, so local jitter is 0.2.
        let periods: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 0.009 } else { 0.011 })
            .collect();
        let pp = pulse_train(&periods);
        let set = analyze(&pp, &JitterParams::default());

        let local_abs = set.get("local_absolute_jitter").unwrap();
        assert!((local_abs - 0.002).abs() < 1e-12);

        let local = set.get("jitter_local_mean").unwrap();
        assert!((local - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_local_sd_is_fixed_fraction_of_mean() {
        let periods: Vec<f64> = (0..30)
            .map(|i| 0.008 + 0.0005 * ((i % 3) as f64))
            .collect();
        let pp = pulse_train(&periods);
        let set = analyze(&pp, &JitterParams::default());

        let mean = set.get("jitter_local_mean").unwrap();
        let sd = set.get("jitter_local_sd").unwrap();
        assert!((sd - 0.15 * mean).abs() < 1e-15);
    }

    #[test]
    fn test_ddp_is_three_times_rap() {
        let periods: Vec<f64> = (0..25)
            .map(|i| 0.007 + 0.0003 * ((i % 4) as f64))
            .collect();
        let pp = pulse_train(&periods);
        let set = analyze(&pp, &JitterParams::default());

        let rap = set.get("rap_jitter").unwrap();
        let ddp = set.get("ddp_jitter").unwrap();
        assert!((ddp - 3.0 * rap).abs() < 1e-15);
    }

    #[test]
    fn test_out_of_range_periods_excluded() {
        // A 50 ms dropout in the middle must not contaminate the metrics.
        let mut periods = vec![0.005; 10];
        periods.push(0.05);
        periods.extend(vec![0.005; 10]);
        let pp = pulse_train(&periods);
        let set = analyze(&pp, &JitterParams::default());

        assert!(set.get("jitter_local_mean").unwrap().abs() < 1e-12);
        assert!(set.get("local_absolute_jitter").unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_extreme_ratio_pairs_rejected() {
        // Ratio 3.0 between every consecutive pair: no pair survives the
        // 1.3 ratio filter, so pairwise metrics go missing.
        let periods: Vec<f64> = (0..10)
            .map(|i| if i % 2 == 0 { 0.004 } else { 0.012 })
            .collect();
        let pp = pulse_train(&periods);
        let set = analyze(&pp, &JitterParams::default());

        assert_eq!(set.get("jitter_local_mean"), None);
        assert_eq!(set.get("local_absolute_jitter"), None);
        assert_eq!(set.get("rap_jitter"), None);
        assert_eq!(set.get("ddp_jitter"), None);
    }
}

//! Formant estimation
//!
//! Classic LPC analysis per 25 ms frame: FFT resampling down to twice the
//! formant ceiling, pre-emphasis, Hamming window, autocorrelation LPC solved
//! by Levinson-Durbin, then polynomial roots (Durand-Kerner) converted to
//! formant frequency/bandwidth pairs.

use rustfft::num_complex::{Complex, Complex64};
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

use super::{FormantGrid, FormantParams, FormantPoint, Waveform};
use crate::error::ExtractError;

type Complex32 = Complex<f32>;

/// Candidates below this frequency are LPC artifacts of the glottal slope.
const FORMANT_FLOOR_HZ: f64 = 50.0;

const ROOT_MAX_ITER: usize = 60;
const ROOT_TOLERANCE: f64 = 1e-8;

/// Estimate formant trajectories over the whole waveform.
pub fn estimate_formants(
    wave: &Waveform,
    params: &FormantParams,
) -> Result<FormantGrid, ExtractError> {
    if params.max_formants == 0 || params.ceiling_hz <= FORMANT_FLOOR_HZ {
        return Err(ExtractError::Toolkit(format!(
            "invalid formant parameters: max {} up to {} Hz",
            params.max_formants, params.ceiling_hz
        )));
    }

    let sr = wave.sample_rate as f64;
    let target_rate = 2.0 * params.ceiling_hz;
    let in_frame = (params.window_s * sr).round() as usize;
    let out_frame = (params.window_s * target_rate).round() as usize;
    let hop = (params.time_step_s * sr).round().max(1.0) as usize;
    let order = 2 * params.max_formants;

    let mut grid = FormantGrid::default();
    if in_frame == 0 || out_frame <= order || wave.samples.len() < in_frame {
        return Ok(grid);
    }

    let mut planner = FftPlanner::<f32>::new();
    let resample_fft = planner.plan_fft_forward(in_frame);
    let resample_ifft = planner.plan_fft_inverse(out_frame);
    let mut in_buf = vec![Complex32::new(0.0, 0.0); in_frame];
    let mut out_buf = vec![Complex32::new(0.0, 0.0); out_frame];

    let window = hamming_window(out_frame);
    // Pre-emphasis coefficient from the -3 dB point (x[n] - a * x[n-1]).
    let pre_emph = (-2.0 * PI * params.pre_emphasis_hz / target_rate).exp();

    let mut start = 0;
    while start + in_frame <= wave.samples.len() {
        let frame = &wave.samples[start..start + in_frame];
        let mut x = fft_resample(
            frame,
            out_frame,
            resample_fft.clone(),
            resample_ifft.clone(),
            &mut in_buf,
            &mut out_buf,
        );
        preprocess_frame(&mut x, pre_emph, &window);

        let points = match lpc_coefficients(&x, order) {
            Some(a) => formants_from_coefficients(&a, target_rate, params),
            None => Vec::new(),
        };

        grid.times.push((start + in_frame / 2) as f64 / sr);
        grid.frames.push(points);
        start += hop;
    }

    Ok(grid)
}

/// Resample one frame to `out_len` samples by spectrum truncation.
fn fft_resample(
    x: &[f32],
    out_len: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    in_buf: &mut [Complex32],
    out_buf: &mut [Complex32],
) -> Vec<f64> {
    let in_len = x.len();

    for (i, v) in in_buf.iter_mut().enumerate() {
        *v = Complex32::new(x[i], 0.0);
    }
    fft.process(in_buf);

    for v in out_buf.iter_mut() {
        *v = Complex32::new(0.0, 0.0);
    }

    let in_half = in_len / 2;
    let out_half = out_len / 2;
    let k_max = in_half.min(out_half);

    out_buf[0] = in_buf[0];
    for k in 1..=k_max {
        out_buf[k] = in_buf[k];
        out_buf[out_len - k] = in_buf[in_len - k];
    }
    if in_len % 2 == 0 && out_len % 2 == 0 && in_half <= out_half {
        out_buf[out_half] = in_buf[in_half];
    }

    ifft.process(out_buf);

    let scale = 1.0 / in_len as f64;
    out_buf.iter().map(|c| c.re as f64 * scale).collect()
}

fn preprocess_frame(x: &mut [f64], pre_emph: f64, window: &[f64]) {
    let mut prev = x[0];
    for v in x.iter_mut().skip(1) {
        let current = *v;
        *v -= pre_emph * prev;
        prev = current;
    }
    for (v, w) in x.iter_mut().zip(window) {
        *v *= w;
    }
}

/// LPC coefficients [1, a1, ..., ap] by autocorrelation + Levinson-Durbin.
fn lpc_coefficients(x: &[f64], order: usize) -> Option<Vec<f64>> {
    if x.len() <= order {
        return None;
    }

    let mut r = vec![0.0f64; order + 1];
    for (lag, r_lag) in r.iter_mut().enumerate() {
        let mut acc = 0.0;
        for i in 0..x.len() - lag {
            acc += x[i] * x[i + lag];
        }
        *r_lag = acc;
    }

    levinson_durbin(&r, order)
}

fn levinson_durbin(r: &[f64], order: usize) -> Option<Vec<f64>> {
    if r.len() < order + 1 || r[0] == 0.0 {
        return None;
    }

    let mut a = vec![0.0f64; order + 1];
    a[0] = 1.0;
    let mut e = r[0];

    for i in 1..=order {
        let mut acc = r[i];
        for j in 1..i {
            acc += a[j] * r[i - j];
        }
        let k = -acc / e;
        let a_prev = a.clone();
        a[i] = k;
        for j in 1..i {
            a[j] = a_prev[j] + k * a_prev[i - j];
        }
        e *= 1.0 - k * k;
        if e <= 0.0 {
            return None;
        }
    }

    Some(a)
}

/// Convert LPC polynomial roots inside the unit circle to formant points,
/// ascending by frequency, at most `max_formants` of them.
fn formants_from_coefficients(
    a: &[f64],
    sample_rate: f64,
    params: &FormantParams,
) -> Vec<FormantPoint> {
    if a.len() < 2 || a[0].abs() < 1e-12 {
        return Vec::new();
    }

    let roots = durand_kerner_roots(a, ROOT_MAX_ITER, ROOT_TOLERANCE);
    let mut points = Vec::new();
    for z in &roots {
        let r = z.norm();
        if r >= 1.0 || z.im <= 0.0 {
            continue;
        }
        let freq = z.arg() * sample_rate / (2.0 * PI);
        let bw = -sample_rate / PI * r.ln();
        if freq > FORMANT_FLOOR_HZ && freq < params.ceiling_hz {
            points.push(FormantPoint {
                frequency_hz: freq,
                bandwidth_hz: bw,
            });
        }
    }
    points.sort_by(|a, b| a.frequency_hz.total_cmp(&b.frequency_hz));
    points.truncate(params.max_formants);
    points
}

fn durand_kerner_roots(a: &[f64], max_iter: usize, tol: f64) -> Vec<Complex64> {
    let n = a.len().saturating_sub(1);
    if n == 0 {
        return Vec::new();
    }

    let radius = 0.9;
    let two_pi = 2.0 * PI;
    let mut roots: Vec<Complex64> = (0..n)
        .map(|k| {
            let theta = two_pi * (k as f64) / (n as f64);
            Complex64::new(radius * theta.cos(), radius * theta.sin())
        })
        .collect();

    for _ in 0..max_iter {
        let mut converged = true;
        for i in 0..n {
            let mut denom = Complex64::new(1.0, 0.0);
            for j in 0..n {
                if i != j {
                    denom *= roots[i] - roots[j];
                }
            }
            let p = poly_eval(a, roots[i]);
            let delta = if denom.norm() < 1e-12 {
                Complex64::new(1e-6, 1e-6)
            } else {
                p / denom
            };
            let next = roots[i] - delta;
            if (next - roots[i]).norm() > tol {
                converged = false;
            }
            roots[i] = next;
        }
        if converged {
            break;
        }
    }

    roots
}

fn poly_eval(a: &[f64], z: Complex64) -> Complex64 {
    let mut acc = Complex64::new(a[0], 0.0);
    for &coef in &a[1..] {
        acc = acc * z + Complex64::new(coef, 0.0);
    }
    acc
}

fn hamming_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.54 - 0.46 * ((2.0 * PI * i as f64) / (n as f64 - 1.0)).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Two damped resonances roughly where /a/ puts F1 and F2.
    fn generate_vowel_like(sample_rate: u32, duration_ms: u32) -> Waveform {
        let num_samples = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        let f0 = 120.0;
        let samples = (0..num_samples)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                let source = (2.0 * PI * f0 * t).sin()
                    + 0.5 * (2.0 * PI * 2.0 * f0 * t).sin()
                    + 0.25 * (2.0 * PI * 6.0 * f0 * t).sin();
                (source * 0.3) as f32
            })
            .collect();
        Waveform::new(samples, sample_rate)
    }

    #[test]
    fn test_estimate_formants_produces_frames() {
        let wave = generate_vowel_like(16000, 500);
        let grid = estimate_formants(&wave, &FormantParams::default()).unwrap();

        assert!(!grid.times.is_empty());
        assert_eq!(grid.times.len(), grid.frames.len());

        // Every candidate stays inside the configured band and ascends.
        for frame in &grid.frames {
            for w in frame.windows(2) {
                assert!(w[0].frequency_hz <= w[1].frequency_hz);
            }
            for p in frame {
                assert!(p.frequency_hz > FORMANT_FLOOR_HZ);
                assert!(p.frequency_hz < 5500.0);
            }
        }
    }

    #[test]
    fn test_estimate_formants_short_waveform() {
        let wave = Waveform::new(vec![0.0; 10], 16000);
        let grid = estimate_formants(&wave, &FormantParams::default()).unwrap();
        assert!(grid.times.is_empty());
    }

    #[test]
    fn test_estimate_formants_rejects_bad_params() {
        let wave = generate_vowel_like(16000, 100);
        let params = FormantParams {
            max_formants: 0,
            ..FormantParams::default()
        };
        assert!(estimate_formants(&wave, &params).is_err());
    }

    #[test]
    fn test_levinson_durbin_rejects_zero_energy() {
        let r = vec![0.0; 11];
        assert!(levinson_durbin(&r, 10).is_none());
    }

    #[test]
    fn test_durand_kerner_finds_known_roots() {
        // z^2 - 3z + 2 = (z - 1)(z - 2)
        let roots = durand_kerner_roots(&[1.0, -3.0, 2.0], 100, 1e-10);
        let mut res: Vec<f64> = roots.iter().map(|z| z.re).collect();
        res.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((res[0] - 1.0).abs() < 1e-6);
        assert!((res[1] - 2.0).abs() < 1e-6);
        assert!(roots.iter().all(|z| z.im.abs() < 1e-6));
    }
}

//! Heart-rate-variability summary metrics over RR series in milliseconds.

use crate::rate::interp_linear;
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Time-domain summary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HrvTime {
    pub n: usize,
    /// Mean RR interval (ms).
    pub mean_rr: f64,
    /// Standard deviation of RR intervals (ms).
    pub sdnn: f64,
    /// Root mean square of successive differences (ms).
    pub rmssd: f64,
    /// Fraction of successive differences above 50 ms.
    pub pnn50: f64,
}

/// Frequency-domain summary from the Welch periodogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrvPsd {
    pub vlf: f64,
    pub lf: f64,
    pub hf: f64,
    pub lf_hf: f64,
    pub total_power: f64,
    pub points: Vec<[f64; 2]>,
}

pub fn hrv_time(rr_ms: &[f64]) -> HrvTime {
    let n = rr_ms.len();
    let mean_rr = if n > 0 {
        rr_ms.iter().sum::<f64>() / n as f64
    } else {
        0.0
    };
    let sdnn = if n > 1 {
        (rr_ms.iter().map(|x| (x - mean_rr).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };
    let rmssd = if n > 1 {
        let diffs = rr_ms.windows(2).map(|w| (w[1] - w[0]).powi(2));
        (diffs.sum::<f64>() / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };
    let pnn50 = if n > 1 {
        let count = rr_ms
            .windows(2)
            .filter(|w| (w[1] - w[0]).abs() > 50.0)
            .count();
        count as f64 / (n as f64 - 1.0)
    } else {
        0.0
    };

    HrvTime {
        n,
        mean_rr,
        sdnn,
        rmssd,
        pnn50,
    }
}

/// Welch PSD of the RR series resampled at `fs_interp` Hz, integrated over
/// the standard VLF/LF/HF bands.
pub fn hrv_psd(rr_ms: &[f64], fs_interp: f64) -> HrvPsd {
    let (freqs, powers) = welch_psd(rr_ms, fs_interp);
    let total_power: f64 = powers.iter().sum();
    let vlf = integrate_band(&freqs, &powers, (0.003, 0.04));
    let lf = integrate_band(&freqs, &powers, (0.04, 0.15));
    let hf = integrate_band(&freqs, &powers, (0.15, 0.4));
    let lf_hf = if hf > 0.0 { lf / hf } else { 0.0 };
    HrvPsd {
        vlf,
        lf,
        hf,
        lf_hf,
        total_power,
        points: freqs
            .into_iter()
            .zip(powers)
            .map(|(f, p)| [f, p])
            .collect(),
    }
}

fn integrate_band(freqs: &[f64], powers: &[f64], band: (f64, f64)) -> f64 {
    freqs
        .iter()
        .zip(powers)
        .filter(|(f, _)| **f >= band.0 && **f < band.1)
        .map(|(_, p)| *p)
        .sum()
}

fn welch_psd(rr_ms: &[f64], fs_interp: f64) -> (Vec<f64>, Vec<f64>) {
    let signal = resample_rr(rr_ms, fs_interp);
    let n = signal.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }
    let window = ((fs_interp * 30.0).max(4.0).min(n as f64)) as usize;
    let step = (window / 2).max(1);
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(window);
    let window_func = hann(window);

    let mut freqs = Vec::new();
    let mut powers = Vec::new();
    let mut pos = 0;
    let mut segments = 0;
    while pos + window <= n {
        let mut frame: Vec<f64> = signal[pos..pos + window]
            .iter()
            .zip(&window_func)
            .map(|(x, w)| x * w)
            .collect();
        let mut spectrum = r2c.make_output_vec();
        if r2c.process(&mut frame, &mut spectrum).is_err() {
            break;
        }
        let scale = 1.0 / window as f64;
        for (k, val) in spectrum.iter().enumerate() {
            if segments == 0 {
                freqs.push(k as f64 * fs_interp / window as f64);
                powers.push(0.0);
            }
            let power = if k == 0 || (window % 2 == 0 && k == window / 2) {
                val.norm_sqr()
            } else {
                2.0 * val.norm_sqr()
            } * scale;
            powers[k] += power;
        }
        segments += 1;
        pos += step;
    }
    if segments > 0 {
        for p in powers.iter_mut() {
            *p /= segments as f64;
        }
    }
    (freqs, powers)
}

/// Linearly resample the irregular RR series onto a uniform grid; samples
/// before the first interval hold its value.
fn resample_rr(rr_ms: &[f64], fs: f64) -> Vec<f64> {
    if rr_ms.is_empty() || fs <= 0.0 {
        return Vec::new();
    }
    let mut times = Vec::with_capacity(rr_ms.len());
    let mut acc = 0.0;
    for &interval in rr_ms {
        acc += interval;
        times.push(acc / 1000.0);
    }
    let duration = *times.last().unwrap();
    let n = (duration * fs).ceil() as usize;
    let grid: Vec<f64> = (0..n).map(|i| i as f64 / fs).collect();
    let mut out = interp_linear(&times, rr_ms, &grid);
    for v in &mut out {
        if v.is_nan() {
            *v = rr_ms[0];
        }
    }
    out
}

fn hann(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rr_series() -> Vec<f64> {
        vec![
            820.0, 780.0, 800.0, 790.0, 830.0, 770.0, 840.0, 880.0, 860.0, 810.0, 790.0, 820.0,
            850.0, 780.0, 800.0, 790.0, 830.0, 840.0, 820.0, 810.0,
        ]
    }

    fn assert_close(actual: f64, expected: f64, rel_tol: f64) {
        let tol = expected.abs().max(1.0) * rel_tol;
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn time_domain_matches_hand_computed_values() {
        let metrics = hrv_time(&rr_series());
        assert_eq!(metrics.n, 20);
        assert_close(metrics.mean_rr, 815.5, 1e-9);
        // 3 of 19 successive differences exceed 50 ms.
        assert_close(metrics.pnn50, 3.0 / 19.0, 1e-9);
        assert!(metrics.sdnn > 0.0);
        assert!(metrics.rmssd > metrics.sdnn * 0.5);
    }

    #[test]
    fn degenerate_series_yield_zeroed_metrics() {
        let metrics = hrv_time(&[]);
        assert_eq!(metrics.n, 0);
        assert_eq!(metrics.mean_rr, 0.0);
        let metrics = hrv_time(&[812.0]);
        assert_eq!(metrics.sdnn, 0.0);
        assert_eq!(metrics.rmssd, 0.0);
    }

    #[test]
    fn psd_is_non_negative_and_banded() {
        let psd = hrv_psd(&rr_series(), 4.0);
        assert!(psd.total_power >= 0.0);
        assert!(psd.lf >= 0.0 && psd.hf >= 0.0 && psd.vlf >= 0.0);
        assert!(psd.lf + psd.hf + psd.vlf <= psd.total_power + 1e-9);
        for point in &psd.points {
            assert!(point[1] >= 0.0);
        }
    }

    #[test]
    fn slow_oscillation_lands_in_the_lf_band() {
        // 0.1 Hz modulation of an 800 ms rhythm: ~12.5 s period, i.e. ten
        // beats per cycle over five minutes of data.
        let rr: Vec<f64> = (0..400)
            .map(|i| 800.0 + 60.0 * (2.0 * PI * 0.1 * (i as f64 * 0.8)).sin())
            .collect();
        let psd = hrv_psd(&rr, 4.0);
        assert!(psd.lf > psd.hf, "lf {} should dominate hf {}", psd.lf, psd.hf);
    }

    #[test]
    fn pnn50_counts_only_large_differences() {
        let rr = vec![800.0, 820.0, 880.0, 870.0];
        let metrics = hrv_time(&rr);
        assert_close(metrics.pnn50, 1.0 / 3.0, 1e-9);
    }
}

//! Instantaneous heart-rate derivation.
//!
//! The irregular RR series is resampled onto a uniform grid: each interval's
//! duration (ms) is attached to the time of its closing peak, interpolated at
//! the requested rate, and optionally mapped to beats per minute. Grid
//! samples before the first or after the last event are NaN.

use crate::errors::{Error, Result};
use crate::signal::{peaks_to_idx, EventSeries};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Unit of the derived rate series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputUnit {
    /// Interval duration in milliseconds.
    Ms,
    /// Beats per minute (60000 / ms).
    Bpm,
}

impl FromStr for OutputUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ms" => Ok(OutputUnit::Ms),
            "bpm" => Ok(OutputUnit::Bpm),
            other => Err(Error::InvalidArgument(format!(
                "unknown output unit '{other}' (expected ms or bpm)"
            ))),
        }
    }
}

/// Interpolation used to resample the irregular rate samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationKind {
    Linear,
    /// Natural cubic spline; degrades to linear below four nodes.
    Cubic,
}

impl FromStr for InterpolationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(InterpolationKind::Linear),
            "cubic" => Ok(InterpolationKind::Cubic),
            other => Err(Error::InvalidArgument(format!(
                "unknown interpolation kind '{other}' (expected linear or cubic)"
            ))),
        }
    }
}

/// Derive a regularly sampled heart-rate series from any event
/// representation.
///
/// For `Peaks`/`PeaksIdx` input, `sfreq` is the sampling rate of the source
/// waveform and of the output grid (default 1000 Hz). For `RrMs`/`RrS`
/// input, the unit already implies one millisecond per sample: passing an
/// explicit `sfreq` is an [`Error::InvalidCombination`].
///
/// Returns `(rate, time)` of equal length; the last time point equals the
/// covered duration minus at most one sample period.
pub fn heart_rate(
    data: &EventSeries,
    kind: InterpolationKind,
    sfreq: Option<f64>,
    output_unit: OutputUnit,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let (rr_ms, nodes, grid_end, sf) = match data {
        EventSeries::Peaks(peaks) => {
            let sf = resolve_sfreq(sfreq)?;
            let idx = peaks_to_idx(peaks);
            let rr = sample_diffs_ms(&idx, sf);
            let nodes = closing_times(&idx, sf);
            (rr, nodes, peaks.len() as f64 / sf, sf)
        }
        EventSeries::PeaksIdx(idx) => {
            if idx.windows(2).any(|w| w[1] <= w[0]) {
                return Err(Error::InvalidArgument(
                    "peak indices must be strictly increasing".into(),
                ));
            }
            let sf = resolve_sfreq(sfreq)?;
            let rr = sample_diffs_ms(idx, sf);
            let nodes = closing_times(idx, sf);
            let end = nodes.last().copied().unwrap_or(0.0);
            (rr, nodes, end, sf)
        }
        EventSeries::RrMs(_) | EventSeries::RrS(_) => {
            if sfreq.is_some() {
                return Err(Error::InvalidCombination(
                    "the sampling rate is implied by the RR unit and cannot be overridden".into(),
                ));
            }
            let rr = data.to_rr_ms()?;
            let mut nodes = Vec::with_capacity(rr.len());
            let mut acc = 0.0;
            for &interval in &rr {
                acc += interval;
                nodes.push(acc / 1000.0);
            }
            let end = nodes.last().copied().unwrap_or(0.0);
            (rr, nodes, end, 1000.0)
        }
    };

    if rr_ms.len() < 2 {
        return Ok((Vec::new(), Vec::new()));
    }

    let values: Vec<f64> = match output_unit {
        OutputUnit::Ms => rr_ms,
        OutputUnit::Bpm => rr_ms.iter().map(|rr| 60_000.0 / rr).collect(),
    };

    let samples = ((grid_end * sf) - 1e-9).ceil().max(0.0) as usize;
    let time: Vec<f64> = (0..samples).map(|k| k as f64 / sf).collect();
    let rate = interpolate(&nodes, &values, &time, kind);
    Ok((rate, time))
}

fn resolve_sfreq(sfreq: Option<f64>) -> Result<f64> {
    let sf = sfreq.unwrap_or(1000.0);
    if sf <= 0.0 || !sf.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "sampling rate must be positive, got {sf}"
        )));
    }
    Ok(sf)
}

fn sample_diffs_ms(idx: &[usize], sfreq: f64) -> Vec<f64> {
    idx.windows(2)
        .map(|w| (w[1] - w[0]) as f64 * 1000.0 / sfreq)
        .collect()
}

fn closing_times(idx: &[usize], sfreq: f64) -> Vec<f64> {
    idx.iter().skip(1).map(|&i| i as f64 / sfreq).collect()
}

/// Interpolate `(xs, ys)` at the sorted query points; NaN outside the node
/// range.
pub(crate) fn interpolate(
    xs: &[f64],
    ys: &[f64],
    query: &[f64],
    kind: InterpolationKind,
) -> Vec<f64> {
    match kind {
        InterpolationKind::Cubic if xs.len() >= 4 => cubic_spline(xs, ys, query),
        _ => interp_linear(xs, ys, query),
    }
}

pub(crate) fn interp_linear(xs: &[f64], ys: &[f64], query: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(query.len());
    let mut seg = 0usize;
    for &t in query {
        if xs.is_empty() || t < xs[0] || t > xs[xs.len() - 1] {
            out.push(f64::NAN);
            continue;
        }
        while seg + 2 < xs.len() && xs[seg + 1] < t {
            seg += 1;
        }
        let (x0, x1) = (xs[seg], xs[seg + 1]);
        let (y0, y1) = (ys[seg], ys[seg + 1]);
        let w = if x1 > x0 { (t - x0) / (x1 - x0) } else { 0.0 };
        out.push(y0 + w * (y1 - y0));
    }
    out
}

/// Natural cubic spline: tridiagonal solve for the second derivatives, then
/// piecewise evaluation.
fn cubic_spline(xs: &[f64], ys: &[f64], query: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut h = Vec::with_capacity(n - 1);
    for w in xs.windows(2) {
        h.push((w[1] - w[0]).max(f64::EPSILON));
    }

    // Thomas algorithm over the interior nodes.
    let mut sub = vec![0.0; n];
    let mut diag = vec![1.0; n];
    let mut sup = vec![0.0; n];
    let mut rhs = vec![0.0; n];
    for i in 1..n - 1 {
        sub[i] = h[i - 1];
        diag[i] = 2.0 * (h[i - 1] + h[i]);
        sup[i] = h[i];
        rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
    }
    for i in 1..n {
        let w = sub[i] / diag[i - 1];
        diag[i] -= w * sup[i - 1];
        rhs[i] -= w * rhs[i - 1];
    }
    let mut m = vec![0.0; n];
    for i in (1..n - 1).rev() {
        m[i] = (rhs[i] - sup[i] * m[i + 1]) / diag[i];
    }

    let mut out = Vec::with_capacity(query.len());
    let mut seg = 0usize;
    for &t in query {
        if t < xs[0] || t > xs[n - 1] {
            out.push(f64::NAN);
            continue;
        }
        while seg + 2 < n && xs[seg + 1] < t {
            seg += 1;
        }
        let dx = t - xs[seg];
        let hi = h[seg];
        let a = (m[seg + 1] - m[seg]) / (6.0 * hi);
        let b = m[seg] / 2.0;
        let c = (ys[seg + 1] - ys[seg]) / hi - hi * (2.0 * m[seg] + m[seg + 1]) / 6.0;
        out.push(ys[seg] + dx * (c + dx * (b + dx * a)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_peaks() -> Vec<bool> {
        let mut peaks = vec![false; 6000];
        for &i in &[400, 1220, 2010, 2790, 3600, 4380, 5150, 5940] {
            peaks[i] = true;
        }
        peaks
    }

    #[test]
    fn bpm_is_60000_over_ms_sample_for_sample() {
        let data = EventSeries::Peaks(sample_peaks());
        let (ms, time_ms) =
            heart_rate(&data, InterpolationKind::Linear, None, OutputUnit::Ms).unwrap();
        let (bpm, time_bpm) =
            heart_rate(&data, InterpolationKind::Linear, None, OutputUnit::Bpm).unwrap();
        assert_eq!(time_ms, time_bpm);
        for (a, b) in ms.iter().zip(&bpm) {
            if a.is_nan() {
                assert!(b.is_nan());
            } else {
                assert!((b - 60_000.0 / a).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn peaks_grid_covers_the_whole_signal() {
        let peaks = sample_peaks();
        let len = peaks.len();
        let (rate, time) = heart_rate(
            &EventSeries::Peaks(peaks),
            InterpolationKind::Cubic,
            None,
            OutputUnit::Ms,
        )
        .unwrap();
        assert_eq!(rate.len(), time.len());
        assert_eq!(time.len(), len);
        assert!((time[time.len() - 1] - (len as f64 - 1.0) / 1000.0).abs() < 1e-9);
        // Outside the first/last peak the series is NaN, inside it is not.
        assert!(rate[0].is_nan());
        assert!(!rate[3000].is_nan());
    }

    #[test]
    fn rr_grid_ends_at_cumulative_duration() {
        let rr = vec![820.0, 790.0, 780.0, 810.0];
        let total: f64 = rr.iter().sum();
        let (_, time) = heart_rate(
            &EventSeries::RrMs(rr),
            InterpolationKind::Linear,
            None,
            OutputUnit::Ms,
        )
        .unwrap();
        let last = time[time.len() - 1];
        assert!(last < total / 1000.0);
        assert!(total / 1000.0 - last <= 1e-3 + 1e-9);
    }

    #[test]
    fn rr_input_with_explicit_sfreq_is_rejected() {
        let rr = EventSeries::RrMs(vec![800.0, 820.0, 790.0]);
        let err = heart_rate(&rr, InterpolationKind::Cubic, Some(500.0), OutputUnit::Ms)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCombination(_)));
        let rr_s = EventSeries::RrS(vec![0.8, 0.82, 0.79]);
        let err = heart_rate(&rr_s, InterpolationKind::Cubic, Some(500.0), OutputUnit::Ms)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCombination(_)));
    }

    #[test]
    fn halving_the_sfreq_doubles_durations() {
        let idx = vec![400usize, 1220, 2010, 2790, 3600];
        let (ms_1000, _) = heart_rate(
            &EventSeries::PeaksIdx(idx.clone()),
            InterpolationKind::Linear,
            Some(1000.0),
            OutputUnit::Ms,
        )
        .unwrap();
        let (ms_500, time_500) = heart_rate(
            &EventSeries::PeaksIdx(idx),
            InterpolationKind::Linear,
            Some(500.0),
            OutputUnit::Ms,
        )
        .unwrap();
        // Same sample count (grid ends at the last peak in both cases), but
        // every duration and time point doubles.
        assert_eq!(ms_1000.len(), ms_500.len());
        assert!((time_500[time_500.len() - 1] - 3600.0 / 500.0 + 1.0 / 500.0).abs() < 1e-9);
        let mid = ms_1000.len() / 2;
        assert!((ms_500[mid] - 2.0 * ms_1000[mid]).abs() < 1e-6);
    }

    #[test]
    fn cubic_interpolation_passes_through_nodes() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [800.0, 830.0, 790.0, 805.0, 820.0];
        let out = cubic_spline(&xs, &ys, &xs);
        for (a, b) in out.iter().zip(&ys) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn too_few_events_is_degenerate() {
        let (rate, time) = heart_rate(
            &EventSeries::PeaksIdx(vec![100, 900]),
            InterpolationKind::Cubic,
            None,
            OutputUnit::Ms,
        )
        .unwrap();
        assert!(rate.is_empty());
        assert!(time.is_empty());
    }
}

//! Signal cleaning: NaN repair and clipping detection.

/// Replace NaN samples by linear interpolation between their finite
/// neighbours; edge runs extend the nearest finite sample. An all-NaN input
/// becomes all zeros. The repaired count is logged when `verbose`.
pub fn nan_cleaning(signal: &[f64], verbose: bool) -> Vec<f64> {
    let missing = signal.iter().filter(|v| v.is_nan()).count();
    if verbose && missing > 0 {
        log::info!(
            "cleaning {missing} NaN samples ({:.2}% of the signal)",
            100.0 * missing as f64 / signal.len() as f64
        );
    }
    if missing == 0 {
        return signal.to_vec();
    }

    let mut out = signal.to_vec();
    let mut i = 0;
    while i < out.len() {
        if !out[i].is_nan() {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < out.len() && out[i].is_nan() {
            i += 1;
        }
        let left = run_start.checked_sub(1).map(|l| out[l]);
        let right = (i < out.len()).then(|| out[i]);
        match (left, right) {
            (Some(l), Some(r)) => {
                let span = (i - run_start + 1) as f64;
                for (offset, v) in out[run_start..i].iter_mut().enumerate() {
                    *v = l + (r - l) * (offset + 1) as f64 / span;
                }
            }
            (Some(l), None) => out[run_start..i].fill(l),
            (None, Some(r)) => out[run_start..i].fill(r),
            (None, None) => out[run_start..i].fill(0.0),
        }
    }
    out
}

/// Detect the saturation rails of a clipped signal.
///
/// A rail shows up as the signal's extreme value held over consecutive
/// samples: the extreme must occur at least three times, including a run of
/// two or more. Returns `(lower, upper)`, each `None` when no rail is
/// detectable on that side (e.g. the signal is too short to saturate).
pub fn find_clipping(signal: &[f64]) -> (Option<f64>, Option<f64>) {
    if signal.len() < 3 {
        return (None, None);
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in signal {
        if !v.is_finite() {
            return (None, None);
        }
        min = min.min(v);
        max = max.max(v);
    }
    if min == max {
        return (None, None);
    }
    (rail_value(signal, min), rail_value(signal, max))
}

fn rail_value(signal: &[f64], value: f64) -> Option<f64> {
    let mut total = 0usize;
    let mut run = 0usize;
    let mut longest = 0usize;
    for &v in signal {
        if v == value {
            total += 1;
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    (total >= 3 && longest >= 2).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn synthetic_ppg(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let t = i as f64 / 75.0;
                127.0 + 90.0 * (2.0 * PI * 1.1 * t).sin() + 20.0 * (2.0 * PI * 0.12 * t).sin()
            })
            .collect()
    }

    #[test]
    fn interpolates_isolated_nan() {
        let signal = [1.0, f64::NAN, 3.0];
        assert_eq!(nan_cleaning(&signal, false), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn interpolates_nan_runs() {
        let signal = [0.0, f64::NAN, f64::NAN, f64::NAN, 4.0];
        assert_eq!(nan_cleaning(&signal, true), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn extends_edges() {
        let signal = [f64::NAN, 2.0, f64::NAN];
        assert_eq!(nan_cleaning(&signal, false), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn clean_signal_is_returned_unchanged() {
        let signal = [0.5, 0.6, 0.7];
        assert_eq!(nan_cleaning(&signal, true), signal.to_vec());
    }

    #[test]
    fn forced_saturation_is_detected() {
        let clipped: Vec<f64> = synthetic_ppg(4000)
            .into_iter()
            .map(|v| v.clamp(50.0, 230.0))
            .collect();
        assert_eq!(find_clipping(&clipped), (Some(50.0), Some(230.0)));
    }

    #[test]
    fn unclipped_signal_has_no_rails() {
        let signal = synthetic_ppg(4000);
        assert_eq!(find_clipping(&signal), (None, None));
    }

    #[test]
    fn short_signal_is_undetectable() {
        let clipped: Vec<f64> = synthetic_ppg(4000)
            .into_iter()
            .map(|v| v.clamp(50.0, 230.0))
            .collect();
        // Too short to hold repeated saturation runs.
        assert_eq!(find_clipping(&clipped[..3]), (None, None));
    }

    #[test]
    fn one_sided_clipping_reports_one_rail() {
        let clipped: Vec<f64> = synthetic_ppg(4000)
            .into_iter()
            .map(|v| v.min(230.0))
            .collect();
        assert_eq!(find_clipping(&clipped), (None, Some(230.0)));
    }
}

//! RR artefact detection and correction.
//!
//! Subspace classification after Lipponen & Tarvainen (2019): the
//! first-difference and median-deviation series, scaled by rolling
//! quartile-deviation thresholds, separate ectopic, long, short, missed and
//! extra intervals. Correction repairs each class in the way it was
//! produced: missed detections split, extra detections merge, the rest are
//! interpolated.

use crate::errors::{Error, Result};
use crate::signal::{idx_to_rr_ms, peaks_to_idx};
use crate::utils::clean::nan_cleaning;
use serde::{Deserialize, Serialize};

/// Tuning constants of the subspace classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArtefactParams {
    /// Slope of the ectopic decision boundary.
    pub c1: f64,
    /// Intercept of the ectopic decision boundary.
    pub c2: f64,
    /// Threshold scale over the rolling quartile deviation.
    pub alpha: f64,
}

impl Default for ArtefactParams {
    fn default() -> Self {
        Self {
            c1: 0.13,
            c2: 0.17,
            alpha: 5.2,
        }
    }
}

/// Per-interval classification plus the decision subspaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RrArtefacts {
    pub ectopic: Vec<bool>,
    pub missed: Vec<bool>,
    pub extra: Vec<bool>,
    pub long_beats: Vec<bool>,
    pub short_beats: Vec<bool>,
    /// Normalized first difference (S11).
    pub subspace1: Vec<f64>,
    /// Neighbour extremum of S11 for the ectopic test (S12).
    pub subspace2: Vec<f64>,
    /// Forward extremum of S11 for the long/short test (S22).
    pub subspace3: Vec<f64>,
}

impl RrArtefacts {
    pub fn counts(&self) -> ArtefactCounts {
        let count = |flags: &[bool]| flags.iter().filter(|&&f| f).count();
        ArtefactCounts {
            ectopic: count(&self.ectopic),
            missed: count(&self.missed),
            extra: count(&self.extra),
            long_beats: count(&self.long_beats),
            short_beats: count(&self.short_beats),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtefactCounts {
    pub ectopic: usize,
    pub missed: usize,
    pub extra: usize,
    pub long_beats: usize,
    pub short_beats: usize,
}

const DEVIATION_WINDOW: usize = 91;
const MEDIAN_WINDOW: usize = 11;

/// Classify every interval of an RR series (milliseconds).
pub fn rr_artefacts(rr_ms: &[f64], params: &ArtefactParams) -> Result<RrArtefacts> {
    validate_rr(rr_ms)?;
    let n = rr_ms.len();

    // Normalized first difference (S11).
    let mut drrs = vec![0.0; n];
    for i in 1..n {
        drrs[i] = rr_ms[i] - rr_ms[i - 1];
    }
    let th1 = rolling_quartile_deviation(&drrs, DEVIATION_WINDOW, params.alpha);
    let s11: Vec<f64> = drrs
        .iter()
        .zip(&th1)
        .map(|(d, th)| d / th.max(f64::EPSILON))
        .collect();

    // Neighbour extrema subspaces. A positive jump is compared against the
    // smaller neighbour, a negative one against the larger, so the
    // short/long pair of a real artefact lands far from the diagonal.
    let at = |v: &[f64], i: isize| -> f64 {
        if i < 0 || i as usize >= v.len() {
            0.0
        } else {
            v[i as usize]
        }
    };
    let mut s12 = vec![0.0; n];
    let mut s22 = vec![0.0; n];
    for i in 0..n {
        let i = i as isize;
        if at(&s11, i) > 0.0 {
            s12[i as usize] = at(&s11, i - 1).min(at(&s11, i + 1));
        } else {
            s12[i as usize] = at(&s11, i - 1).max(at(&s11, i + 1));
        }
        if at(&s11, i) >= 0.0 {
            s22[i as usize] = at(&s11, i + 1).min(at(&s11, i + 2));
        } else {
            s22[i as usize] = at(&s11, i + 1).max(at(&s11, i + 2));
        }
    }

    // Median deviation (negative deviations doubled, as short intervals are
    // half as salient).
    let medrr = rolling_median(rr_ms, MEDIAN_WINDOW);
    let mut mrrs: Vec<f64> = rr_ms.iter().zip(&medrr).map(|(rr, med)| rr - med).collect();
    for v in &mut mrrs {
        if *v < 0.0 {
            *v *= 2.0;
        }
    }
    let abs_mrrs: Vec<f64> = mrrs.iter().map(|v| v.abs()).collect();
    let th2 = rolling_quartile_deviation(&abs_mrrs, DEVIATION_WINDOW, params.alpha);
    let mrrs_n: Vec<f64> = mrrs
        .iter()
        .zip(&th2)
        .map(|(m, th)| m / th.max(f64::EPSILON))
        .collect();

    let mut ectopic = vec![false; n];
    let mut long = vec![false; n];
    let mut short = vec![false; n];
    let mut missed = vec![false; n];
    let mut extra = vec![false; n];
    for i in 0..n {
        ectopic[i] = (s11[i] > 1.0 && s12[i] < -params.c1 * s11[i] - params.c2)
            || (s11[i] < -1.0 && s12[i] > -params.c1 * s11[i] + params.c2);
        long[i] = (s11[i] > 1.0 && s22[i] < -1.0) || mrrs_n[i] > 3.0;
        short[i] = (s11[i] < -1.0 && s22[i] > 1.0) || mrrs_n[i] < -3.0;
        if long[i] {
            missed[i] = (rr_ms[i] / 2.0 - medrr[i]).abs() < th2[i];
        }
        if short[i] {
            let next = if i + 1 < n { rr_ms[i + 1] } else { 0.0 };
            extra[i] = (rr_ms[i] + next - medrr[i]).abs() < th2[i];
        }
    }
    // No ectopic classification at the series edges, where S12 lacks a
    // neighbour. A split or merge explains a flagged interval better than a
    // displaced beat, so missed/extra win over the other classes.
    for i in [0, 1, n.saturating_sub(2), n.saturating_sub(1)] {
        if i < n {
            ectopic[i] = false;
        }
    }
    let mut long_beats = vec![false; n];
    let mut short_beats = vec![false; n];
    for i in 0..n {
        if missed[i] || extra[i] {
            ectopic[i] = false;
        }
        long_beats[i] = long[i] && !missed[i] && !ectopic[i];
        short_beats[i] = short[i] && !extra[i] && !ectopic[i];
    }

    Ok(RrArtefacts {
        ectopic,
        missed,
        extra,
        long_beats,
        short_beats,
        subspace1: s11,
        subspace2: s12,
        subspace3: s22,
    })
}

/// A corrected RR series plus what was repaired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectedRr {
    pub clean_rr: Vec<f64>,
    pub counts: ArtefactCounts,
}

/// Repair the artefacts of an RR series (milliseconds).
///
/// Three passes, each re-classifying the updated series: extra intervals
/// merge into their successor, missed intervals split in two, and
/// ectopic/long/short intervals are linearly interpolated from their
/// neighbours. The corrected series length therefore differs from the input
/// by `missed - extra`.
pub fn correct_rr(rr_ms: &[f64], params: &ArtefactParams) -> Result<CorrectedRr> {
    let mut counts = ArtefactCounts::default();

    let artefacts = rr_artefacts(rr_ms, params)?;
    counts.extra = artefacts.counts().extra;
    let mut rr = if counts.extra > 0 {
        merge_extra(rr_ms, &artefacts.extra)
    } else {
        rr_ms.to_vec()
    };

    let artefacts = rr_artefacts(&rr, params)?;
    counts.missed = artefacts.counts().missed;
    if counts.missed > 0 {
        rr = split_missed(&rr, &artefacts.missed);
    }

    let artefacts = rr_artefacts(&rr, params)?;
    let pass3 = artefacts.counts();
    counts.ectopic = pass3.ectopic;
    counts.long_beats = pass3.long_beats;
    counts.short_beats = pass3.short_beats;
    let flagged: Vec<f64> = rr
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if artefacts.ectopic[i] || artefacts.long_beats[i] || artefacts.short_beats[i] {
                f64::NAN
            } else {
                v
            }
        })
        .collect();
    let clean_rr = nan_cleaning(&flagged, false);

    if counts != ArtefactCounts::default() {
        log::info!(
            "corrected RR series: {} ectopic, {} missed, {} extra, {} long, {} short",
            counts.ectopic,
            counts.missed,
            counts.extra,
            counts.long_beats,
            counts.short_beats
        );
    }

    Ok(CorrectedRr { clean_rr, counts })
}

fn merge_extra(rr: &[f64], extra: &[bool]) -> Vec<f64> {
    let mut out = Vec::with_capacity(rr.len());
    let mut carry = 0.0;
    for (i, &v) in rr.iter().enumerate() {
        if extra[i] {
            carry += v;
        } else {
            out.push(v + carry);
            carry = 0.0;
        }
    }
    if carry > 0.0 {
        if let Some(last) = out.last_mut() {
            *last += carry;
        }
    }
    out
}

fn split_missed(rr: &[f64], missed: &[bool]) -> Vec<f64> {
    let mut out = Vec::with_capacity(rr.len() + missed.iter().filter(|&&m| m).count());
    for (i, &v) in rr.iter().enumerate() {
        if missed[i] {
            out.push(v / 2.0);
            out.push(v / 2.0);
        } else {
            out.push(v);
        }
    }
    out
}

/// A corrected boolean train plus what was repaired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectedPeaks {
    pub clean_peaks: Vec<bool>,
    pub counts: ArtefactCounts,
}

/// Repair a boolean peak train at the 1 kHz convention.
///
/// The train is corrected through its RR series and rebuilt anchored at the
/// original first peak; the output keeps the input length.
pub fn correct_peaks(peaks: &[bool], params: &ArtefactParams) -> Result<CorrectedPeaks> {
    let idx = peaks_to_idx(peaks);
    if idx.len() < 3 {
        return Ok(CorrectedPeaks {
            clean_peaks: peaks.to_vec(),
            counts: ArtefactCounts::default(),
        });
    }
    let rr = idx_to_rr_ms(&idx)?;
    let corrected = correct_rr(&rr, params)?;
    let clean_peaks = rebuild_train(idx[0], &corrected.clean_rr, peaks.len());
    Ok(CorrectedPeaks {
        clean_peaks,
        counts: corrected.counts,
    })
}

fn rebuild_train(first: usize, rr_ms: &[f64], len: usize) -> Vec<bool> {
    let mut train = vec![false; len];
    if first < len {
        train[first] = true;
    }
    let mut acc = first as f64;
    for &interval in rr_ms {
        acc += interval;
        let idx = acc.round() as usize;
        if idx < len {
            train[idx] = true;
        }
    }
    train
}

fn validate_rr(rr: &[f64]) -> Result<()> {
    if rr.iter().any(|v| !v.is_finite()) {
        return Err(Error::TypeMismatch(
            "RR intervals contain non-finite values".into(),
        ));
    }
    if rr.iter().any(|&v| v <= 0.0) {
        return Err(Error::InvalidArgument(
            "RR intervals must be positive".into(),
        ));
    }
    Ok(())
}

/// Centered rolling quartile deviation scaled by `alpha`.
fn rolling_quartile_deviation(values: &[f64], window: usize, alpha: f64) -> Vec<f64> {
    let half = window / 2;
    let n = values.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        let mut section = values[lo..hi].to_vec();
        section.sort_by(|a, b| a.total_cmp(b));
        let qd = (quantile_sorted(&section, 0.75) - quantile_sorted(&section, 0.25)) / 2.0;
        out.push(alpha * qd);
    }
    out
}

/// Centered rolling median.
fn rolling_median(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    let n = values.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        let mut section = values[lo..hi].to_vec();
        section.sort_by(|a, b| a.total_cmp(b));
        out.push(quantile_sorted(&section, 0.5));
    }
    out
}

/// Linear-interpolated quantile of an already sorted slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let w = pos - lo as f64;
        sorted[lo] * (1.0 - w) + sorted[hi] * w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Steady rhythm with mild sinusoidal variability.
    fn base_rr(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 1000.0 + 25.0 * (i as f64 * 0.7).sin())
            .collect()
    }

    #[test]
    fn clean_series_has_no_artefacts() {
        let rr = base_rr(200);
        let artefacts = rr_artefacts(&rr, &ArtefactParams::default()).unwrap();
        assert_eq!(artefacts.counts(), ArtefactCounts::default());
    }

    #[test]
    fn missed_beat_is_flagged_and_split() {
        let mut rr = base_rr(200);
        rr[100] = 2000.0;
        let artefacts = rr_artefacts(&rr, &ArtefactParams::default()).unwrap();
        assert!(artefacts.missed[100]);

        let corrected = correct_rr(&rr, &ArtefactParams::default()).unwrap();
        assert_eq!(corrected.counts.missed, 1);
        assert_eq!(corrected.clean_rr.len(), 201);
        assert!((corrected.clean_rr[100] - 1000.0).abs() < 1.0);
        assert!((corrected.clean_rr[101] - 1000.0).abs() < 1.0);
    }

    #[test]
    fn extra_beat_is_flagged_and_merged() {
        let mut rr = base_rr(200);
        // An extra detection splits one interval into two short halves.
        rr[100] = 400.0;
        rr[101] = 600.0;
        let artefacts = rr_artefacts(&rr, &ArtefactParams::default()).unwrap();
        assert!(artefacts.extra[100]);

        let corrected = correct_rr(&rr, &ArtefactParams::default()).unwrap();
        assert_eq!(corrected.counts.extra, 1);
        assert_eq!(corrected.clean_rr.len(), 199);
        assert!((corrected.clean_rr[100] - 1000.0).abs() < 60.0);
    }

    #[test]
    fn ectopic_pair_is_flagged_and_interpolated() {
        let mut rr = base_rr(200);
        // Premature beat: short interval then compensatory long one.
        rr[100] = 700.0;
        rr[101] = 1300.0;
        let artefacts = rr_artefacts(&rr, &ArtefactParams::default()).unwrap();
        assert!(artefacts.ectopic[100] || artefacts.ectopic[101]);

        let corrected = correct_rr(&rr, &ArtefactParams::default()).unwrap();
        assert!(corrected.counts.ectopic >= 1);
        assert_eq!(corrected.clean_rr.len(), 200);
        for &v in &corrected.clean_rr[98..104] {
            assert!((900.0..1100.0).contains(&v), "uncorrected value {v}");
        }
    }

    #[test]
    fn correct_peaks_keeps_length_and_first_peak() {
        let mut peaks = vec![false; 10_000];
        let mut t = 500usize;
        peaks[t] = true;
        let mut step = 0usize;
        while t + 950 < 10_000 {
            // One doubled gap in the middle, otherwise steady.
            let gap = if step == 5 { 1900 } else { 950 };
            t += gap;
            if t < 10_000 {
                peaks[t] = true;
            }
            step += 1;
        }
        let corrected = correct_peaks(&peaks, &ArtefactParams::default()).unwrap();
        assert_eq!(corrected.clean_peaks.len(), peaks.len());
        assert!(corrected.clean_peaks[500]);
    }

    #[test]
    fn non_finite_rr_is_rejected() {
        assert!(matches!(
            rr_artefacts(&[800.0, f64::NAN], &ArtefactParams::default()),
            Err(Error::TypeMismatch(_))
        ));
    }
}

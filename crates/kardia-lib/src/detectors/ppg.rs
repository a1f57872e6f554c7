//! PPG pulse detection via multi-scale peak and trough detection (MSPTD,
//! Bishop & Ercole).
//!
//! A local-maxima scalogram over all window scales up to half the signal
//! length is reduced to the scale with the most extrema; samples that are
//! extrema at every retained scale are the detected events. Systolic peaks
//! and pulse onsets come from the same scan over maxima and minima.

use super::{train_from_indices, validate_input};
use crate::errors::{Error, Result};
use crate::filters;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which extrema the MSPTD scan should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtremaKind {
    Peaks,
    Onsets,
    PeaksOnsets,
}

impl FromStr for ExtremaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "peaks" => Ok(ExtremaKind::Peaks),
            "onsets" => Ok(ExtremaKind::Onsets),
            "peaks-onsets" => Ok(ExtremaKind::PeaksOnsets),
            other => Err(Error::InvalidArgument(format!(
                "unknown extrema kind '{other}' (expected peaks, onsets or peaks-onsets)"
            ))),
        }
    }
}

/// MSPTD output; the fields requested through [`ExtremaKind`] are filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsptdResult {
    pub peaks: Option<Vec<bool>>,
    pub onsets: Option<Vec<bool>>,
}

/// Run MSPTD on a PPG waveform.
///
/// The combined `PeaksOnsets` call returns exactly what the two individual
/// calls return: both go through the same scalogram scan.
pub fn msptd(signal: &[f64], sfreq: f64, kind: ExtremaKind) -> Result<MsptdResult> {
    validate_input(signal, sfreq)?;

    let detrended = filters::linear_detrend(signal);
    let peaks = match kind {
        ExtremaKind::Peaks | ExtremaKind::PeaksOnsets => Some(train_from_indices(
            &scalogram_extrema(&detrended, Extremum::Maximum),
            signal.len(),
        )),
        ExtremaKind::Onsets => None,
    };
    let onsets = match kind {
        ExtremaKind::Onsets | ExtremaKind::PeaksOnsets => Some(train_from_indices(
            &scalogram_extrema(&detrended, Extremum::Minimum),
            signal.len(),
        )),
        ExtremaKind::Peaks => None,
    };
    Ok(MsptdResult { peaks, onsets })
}

#[derive(Clone, Copy)]
enum Extremum {
    Maximum,
    Minimum,
}

impl Extremum {
    fn holds(self, x: &[f64], center: usize, k: usize) -> bool {
        let n = x.len();
        if center < k || center + k >= n {
            return false;
        }
        match self {
            Extremum::Maximum => x[center] > x[center - k] && x[center] > x[center + k],
            Extremum::Minimum => x[center] < x[center - k] && x[center] < x[center + k],
        }
    }
}

/// Two-pass scalogram reduction: find the scale with the most extrema, then
/// keep samples that are extrema at every scale up to it.
fn scalogram_extrema(x: &[f64], extremum: Extremum) -> Vec<usize> {
    let n = x.len();
    if n < 3 {
        return Vec::new();
    }
    let max_scale = ((n as f64 / 2.0).ceil() as usize).saturating_sub(1);
    if max_scale < 1 {
        return Vec::new();
    }

    let mut best_scale = 1usize;
    let mut best_count = 0usize;
    for k in 1..=max_scale {
        let mut count = 0usize;
        for center in k..n - k {
            if extremum.holds(x, center, k) {
                count += 1;
            }
        }
        if count > best_count {
            best_count = count;
            best_scale = k;
        }
    }
    if best_count == 0 {
        return Vec::new();
    }

    (best_scale..n - best_scale)
        .filter(|&center| (1..=best_scale).all(|k| extremum.holds(x, center, k)))
        .collect()
}

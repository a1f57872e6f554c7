//! Event representations and the conversion layer between them.
//!
//! A detected beat train can be carried as a boolean vector (`Peaks`), a
//! strictly increasing index vector (`PeaksIdx`), or inter-beat intervals in
//! milliseconds (`RrMs`) or seconds (`RrS`). Conversions between indices and
//! intervals assume the 1 kHz convention: one sample is one millisecond.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tag identifying one of the four event representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Peaks,
    PeaksIdx,
    RrMs,
    RrS,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Peaks => "peaks",
            EventKind::PeaksIdx => "peaks_idx",
            EventKind::RrMs => "rr_ms",
            EventKind::RrS => "rr_s",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "peaks" => Ok(EventKind::Peaks),
            "peaks_idx" => Ok(EventKind::PeaksIdx),
            "rr_ms" => Ok(EventKind::RrMs),
            "rr_s" => Ok(EventKind::RrS),
            other => Err(Error::InvalidArgument(format!(
                "unknown event representation '{other}' (expected peaks, peaks_idx, rr_ms or rr_s)"
            ))),
        }
    }
}

/// An event train in one concrete representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeries {
    Peaks(Vec<bool>),
    PeaksIdx(Vec<usize>),
    RrMs(Vec<f64>),
    RrS(Vec<f64>),
}

impl EventSeries {
    pub fn kind(&self) -> EventKind {
        match self {
            EventSeries::Peaks(_) => EventKind::Peaks,
            EventSeries::PeaksIdx(_) => EventKind::PeaksIdx,
            EventSeries::RrMs(_) => EventKind::RrMs,
            EventSeries::RrS(_) => EventKind::RrS,
        }
    }

    /// Convert into another representation.
    ///
    /// Every pairwise conversion is supported; identity conversions clone.
    /// Reconstructing `Peaks`/`PeaksIdx` from intervals places the first
    /// event at index 0: the absolute offset of the original first event is
    /// not recoverable from intervals alone, and downstream consumers rely
    /// on this convention.
    pub fn convert(&self, output: EventKind) -> Result<EventSeries> {
        match (self, output) {
            (EventSeries::Peaks(p), EventKind::Peaks) => Ok(EventSeries::Peaks(p.clone())),
            (EventSeries::Peaks(p), EventKind::PeaksIdx) => {
                Ok(EventSeries::PeaksIdx(peaks_to_idx(p)))
            }
            (EventSeries::Peaks(p), EventKind::RrMs) => {
                Ok(EventSeries::RrMs(idx_to_rr_ms(&peaks_to_idx(p))?))
            }
            (EventSeries::Peaks(p), EventKind::RrS) => {
                let rr = idx_to_rr_ms(&peaks_to_idx(p))?;
                Ok(EventSeries::RrS(scale(&rr, 1e-3)))
            }
            (EventSeries::PeaksIdx(idx), EventKind::Peaks) => {
                Ok(EventSeries::Peaks(idx_to_peaks(idx)?))
            }
            (EventSeries::PeaksIdx(idx), EventKind::PeaksIdx) => {
                Ok(EventSeries::PeaksIdx(idx.clone()))
            }
            (EventSeries::PeaksIdx(idx), EventKind::RrMs) => {
                Ok(EventSeries::RrMs(idx_to_rr_ms(idx)?))
            }
            (EventSeries::PeaksIdx(idx), EventKind::RrS) => {
                Ok(EventSeries::RrS(scale(&idx_to_rr_ms(idx)?, 1e-3)))
            }
            (EventSeries::RrMs(rr), EventKind::Peaks) => {
                Ok(EventSeries::Peaks(idx_to_peaks(&rr_ms_to_idx(rr)?)?))
            }
            (EventSeries::RrMs(rr), EventKind::PeaksIdx) => {
                Ok(EventSeries::PeaksIdx(rr_ms_to_idx(rr)?))
            }
            (EventSeries::RrMs(rr), EventKind::RrMs) => {
                validate_rr(rr)?;
                Ok(EventSeries::RrMs(rr.clone()))
            }
            (EventSeries::RrMs(rr), EventKind::RrS) => {
                validate_rr(rr)?;
                Ok(EventSeries::RrS(scale(rr, 1e-3)))
            }
            (EventSeries::RrS(rr), EventKind::Peaks) => {
                let ms = scale(rr, 1e3);
                Ok(EventSeries::Peaks(idx_to_peaks(&rr_ms_to_idx(&ms)?)?))
            }
            (EventSeries::RrS(rr), EventKind::PeaksIdx) => {
                Ok(EventSeries::PeaksIdx(rr_ms_to_idx(&scale(rr, 1e3))?))
            }
            (EventSeries::RrS(rr), EventKind::RrMs) => {
                validate_rr(rr)?;
                Ok(EventSeries::RrMs(scale(rr, 1e3)))
            }
            (EventSeries::RrS(rr), EventKind::RrS) => {
                validate_rr(rr)?;
                Ok(EventSeries::RrS(rr.clone()))
            }
        }
    }

    /// Normalize to RR intervals in milliseconds.
    pub fn to_rr_ms(&self) -> Result<Vec<f64>> {
        match self.convert(EventKind::RrMs)? {
            EventSeries::RrMs(rr) => Ok(rr),
            _ => unreachable!(),
        }
    }

    /// Normalize to peak sample indices (lossy for interval inputs).
    pub fn to_peaks_idx(&self) -> Result<Vec<usize>> {
        match self.convert(EventKind::PeaksIdx)? {
            EventSeries::PeaksIdx(idx) => Ok(idx),
            _ => unreachable!(),
        }
    }
}

/// Indices of the `true` samples of a boolean train.
pub fn peaks_to_idx(peaks: &[bool]) -> Vec<usize> {
    peaks
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| p.then_some(i))
        .collect()
}

/// Boolean train from a strictly increasing index sequence. The train is
/// exactly long enough to hold the last index.
pub fn idx_to_peaks(idx: &[usize]) -> Result<Vec<bool>> {
    validate_idx(idx)?;
    let Some(&last) = idx.last() else {
        return Ok(Vec::new());
    };
    let mut peaks = vec![false; last + 1];
    for &i in idx {
        peaks[i] = true;
    }
    Ok(peaks)
}

/// RR intervals in milliseconds from peak indices at the 1 kHz convention.
pub fn idx_to_rr_ms(idx: &[usize]) -> Result<Vec<f64>> {
    validate_idx(idx)?;
    Ok(idx.windows(2).map(|w| (w[1] - w[0]) as f64).collect())
}

/// Peak indices from RR intervals in milliseconds, first event at index 0.
pub fn rr_ms_to_idx(rr: &[f64]) -> Result<Vec<usize>> {
    validate_rr(rr)?;
    let mut idx = Vec::with_capacity(rr.len() + 1);
    idx.push(0usize);
    let mut acc = 0.0;
    for &interval in rr {
        acc += interval;
        idx.push(acc.round() as usize);
    }
    Ok(idx)
}

fn scale(values: &[f64], factor: f64) -> Vec<f64> {
    values.iter().map(|v| v * factor).collect()
}

fn validate_idx(idx: &[usize]) -> Result<()> {
    if idx.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::InvalidArgument(
            "peak indices must be strictly increasing".into(),
        ));
    }
    Ok(())
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

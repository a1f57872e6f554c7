//! Trigger-channel normalization and event alignment helpers.

use crate::errors::{Error, Result};
use crate::signal::peaks_to_idx;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::str::FromStr;

/// Comparison direction for trigger thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Higher,
    Lower,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "higher" => Ok(Direction::Higher),
            "lower" => Ok(Direction::Lower),
            other => Err(Error::InvalidArgument(format!(
                "unknown direction '{other}' (expected higher or lower)"
            ))),
        }
    }
}

/// Turn a raw trigger/marker channel into a clean boolean event train.
///
/// Samples beyond the threshold (in the given direction) are events; each
/// run of consecutive marks collapses to its first sample, and further marks
/// within the `n`-sample dead window are ignored.
pub fn norm_triggers(
    triggers: &[f64],
    threshold: f64,
    n: usize,
    direction: Direction,
) -> Result<Vec<bool>> {
    if triggers.iter().any(|v| !v.is_finite()) {
        return Err(Error::TypeMismatch(
            "trigger channel contains non-finite values".into(),
        ));
    }
    let mut marks: Vec<bool> = triggers
        .iter()
        .map(|&v| match direction {
            Direction::Higher => v >= threshold,
            Direction::Lower => v <= threshold,
        })
        .collect();

    let mut events = vec![false; marks.len()];
    for i in 0..marks.len() {
        if marks[i] {
            events[i] = true;
            let end = (i + 1 + n).min(marks.len());
            for m in &mut marks[i + 1..end] {
                *m = false;
            }
        }
    }
    Ok(events)
}

/// Which local extremum [`to_neighbour`] snaps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighbourKind {
    Max,
    Min,
}

impl FromStr for NeighbourKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "max" => Ok(NeighbourKind::Max),
            "min" => Ok(NeighbourKind::Min),
            other => Err(Error::InvalidArgument(format!(
                "unknown neighbour kind '{other}' (expected max or min)"
            ))),
        }
    }
}

/// Snap each flagged sample to the closest local maximum or minimum within
/// +/- `size` samples (clamped at the signal edges).
pub fn to_neighbour(
    signal: &[f64],
    peaks: &[bool],
    kind: NeighbourKind,
    size: usize,
) -> Result<Vec<bool>> {
    if signal.len() != peaks.len() {
        return Err(Error::InvalidArgument(format!(
            "signal ({}) and peaks ({}) lengths differ",
            signal.len(),
            peaks.len()
        )));
    }
    let mut snapped = vec![false; peaks.len()];
    for idx in peaks_to_idx(peaks) {
        let start = idx.saturating_sub(size);
        let end = (idx + size).min(signal.len());
        let mut best = start;
        for i in start..end {
            let better = match kind {
                NeighbourKind::Max => signal[i] > signal[best],
                NeighbourKind::Min => signal[i] < signal[best],
            };
            if better {
                best = i;
            }
        }
        snapped[best] = true;
    }
    Ok(snapped)
}

/// Signed lag from each event to its nearest preceding reference event.
///
/// Events with no preceding reference are skipped, so the output holds one
/// lag per event that has one.
pub fn time_shift(reference: &[f64], events: &[f64]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|&e| {
            reference
                .iter()
                .copied()
                .filter(|&r| r < e)
                .fold(None, |acc: Option<f64>, r| {
                    Some(acc.map_or(r, |a| a.max(r)))
                })
                .map(|r| e - r)
        })
        .collect()
}

/// Circular phase of each event within its enclosing reference interval.
///
/// The phase is `2*pi * (event - start) / (end - start)` for the reference
/// interval `[start, end)` containing the event, always in `[0, 2*pi)`. An
/// event at the last reference maps to 0; events outside the reference span
/// are dropped.
pub fn to_angles(reference: &[f64], events: &[f64]) -> Vec<f64> {
    if reference.is_empty() {
        return Vec::new();
    }
    let mut sorted = reference.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let first = sorted[0];
    let last = sorted[sorted.len() - 1];

    let mut angles = Vec::new();
    for &e in events {
        if e >= first && e < last {
            let pos = sorted.partition_point(|&r| r <= e);
            let start = sorted[pos - 1];
            let end = sorted[pos];
            if end > start {
                angles.push(TAU * (e - start) / (end - start));
            }
        } else if e == last {
            angles.push(0.0);
        }
    }
    angles
}

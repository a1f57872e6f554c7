//! Epoch extraction around trigger events.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Window and baseline configuration for [`to_epochs`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochConfig {
    /// Sampling rate of the signal (Hz).
    pub sfreq: f64,
    /// Window start relative to the trigger (seconds).
    pub tmin: f64,
    /// Window end relative to the trigger (seconds).
    pub tmax: f64,
    /// Baseline sub-window relative to the trigger (seconds); its mean is
    /// subtracted from the epoch.
    pub apply_baseline: Option<(f64, f64)>,
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self {
            sfreq: 1000.0,
            tmin: -1.0,
            tmax: 10.0,
            apply_baseline: None,
        }
    }
}

/// Indices where a marker channel holds the given event value.
pub fn scan_triggers(triggers: &[f64], event_val: f64) -> Vec<usize> {
    triggers
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| (v == event_val).then_some(i))
        .collect()
}

/// Extract a fixed window around each trigger.
///
/// Returns parallel vectors of epochs and per-sample rejection flags. An
/// epoch overlapping the rejection mask is returned empty while its flags
/// are kept, so a fully covered candidate shows up as an empty epoch with a
/// fully set flag vector. Windows extending beyond the signal are dropped
/// with a warning.
pub fn to_epochs(
    signal: &[f64],
    triggers_idx: &[usize],
    config: &EpochConfig,
    reject: Option<&[bool]>,
) -> Result<(Vec<Vec<f64>>, Vec<Vec<bool>>)> {
    if config.sfreq <= 0.0 || !config.sfreq.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "sampling rate must be positive, got {}",
            config.sfreq
        )));
    }
    if config.tmax <= config.tmin {
        return Err(Error::InvalidArgument(format!(
            "epoch window ({}, {}) is empty or inverted",
            config.tmin, config.tmax
        )));
    }
    if let Some(mask) = reject {
        if mask.len() != signal.len() {
            return Err(Error::InvalidArgument(format!(
                "rejection mask ({}) and signal ({}) lengths differ",
                mask.len(),
                signal.len()
            )));
        }
    }
    if let Some((b0, b1)) = config.apply_baseline {
        if b1 <= b0 {
            return Err(Error::InvalidArgument(format!(
                "baseline window ({b0}, {b1}) is empty or inverted"
            )));
        }
    }

    let window = ((config.tmax - config.tmin) * config.sfreq).round() as usize;
    let mut epochs = Vec::with_capacity(triggers_idx.len());
    let mut rejected = Vec::with_capacity(triggers_idx.len());

    for &trigger in triggers_idx {
        let start = trigger as i64 + (config.tmin * config.sfreq).round() as i64;
        let end = start + window as i64;
        if start < 0 || end as usize > signal.len() {
            log::warn!("dropping epoch at sample {trigger}: window outside the signal");
            continue;
        }
        let range = start as usize..end as usize;

        let flags: Vec<bool> = match reject {
            Some(mask) => mask[range.clone()].to_vec(),
            None => vec![false; window],
        };
        if flags.iter().any(|&f| f) {
            epochs.push(Vec::new());
            rejected.push(flags);
            continue;
        }

        let mut epoch = signal[range].to_vec();
        if let Some((b0, b1)) = config.apply_baseline {
            let bs = trigger as i64 + (b0 * config.sfreq).round() as i64;
            let be = trigger as i64 + (b1 * config.sfreq).round() as i64;
            let bs = bs.max(0) as usize;
            let be = (be.max(0) as usize).min(signal.len());
            if be > bs {
                let baseline = signal[bs..be].iter().sum::<f64>() / (be - bs) as f64;
                for v in &mut epoch {
                    *v -= baseline;
                }
            }
        }
        epochs.push(epoch);
        rejected.push(flags);
    }

    Ok((epochs, rejected))
}

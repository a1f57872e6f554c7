//! Beat and pulse detectors.
//!
//! Each detector consumes a raw waveform plus its sampling rate and emits a
//! boolean event train of the same length, one `true` per detected event at
//! its fiducial sample.

pub mod ecg;
pub mod ppg;

pub use ecg::{
    christov, engelse_zeelenberg, hamilton, moving_average, pan_tompkins,
};
pub use ppg::{msptd, ExtremaKind, MsptdResult};

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The ECG detector variants, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcgDetector {
    MovingAverage,
    PanTompkins,
    Hamilton,
    Christov,
    EngelseZeelenberg,
}

impl EcgDetector {
    pub fn name(self) -> &'static str {
        match self {
            EcgDetector::MovingAverage => "moving_average",
            EcgDetector::PanTompkins => "pan_tompkins",
            EcgDetector::Hamilton => "hamilton",
            EcgDetector::Christov => "christov",
            EcgDetector::EngelseZeelenberg => "engelse_zeelenberg",
        }
    }
}

impl fmt::Display for EcgDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EcgDetector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "moving_average" => Ok(EcgDetector::MovingAverage),
            "pan_tompkins" => Ok(EcgDetector::PanTompkins),
            "hamilton" => Ok(EcgDetector::Hamilton),
            "christov" => Ok(EcgDetector::Christov),
            "engelse_zeelenberg" => Ok(EcgDetector::EngelseZeelenberg),
            other => Err(Error::InvalidArgument(format!(
                "unknown ECG detector '{other}'"
            ))),
        }
    }
}

/// Run the selected ECG detector.
pub fn ecg_peaks(signal: &[f64], sfreq: f64, detector: EcgDetector) -> Result<Vec<bool>> {
    match detector {
        EcgDetector::MovingAverage => moving_average(signal, sfreq),
        EcgDetector::PanTompkins => pan_tompkins(signal, sfreq),
        EcgDetector::Hamilton => hamilton(signal, sfreq),
        EcgDetector::Christov => christov(signal, sfreq),
        EcgDetector::EngelseZeelenberg => engelse_zeelenberg(signal, sfreq),
    }
}

pub(crate) fn validate_input(signal: &[f64], sfreq: f64) -> Result<()> {
    if sfreq <= 0.0 || !sfreq.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "sampling rate must be positive, got {sfreq}"
        )));
    }
    if signal.iter().any(|v| !v.is_finite()) {
        return Err(Error::TypeMismatch(
            "signal contains non-finite samples; run nan_cleaning first".into(),
        ));
    }
    Ok(())
}

pub(crate) fn train_from_indices(indices: &[usize], len: usize) -> Vec<bool> {
    let mut train = vec![false; len];
    for &i in indices {
        if i < len {
            train[i] = true;
        }
    }
    train
}

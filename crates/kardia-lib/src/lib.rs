//! Physiological signal analysis: heartbeat and pulse detection, event
//! representation conversion, heart-rate derivation, RR artefact repair,
//! and signal segmentation around events.

pub mod artefacts;
pub mod detectors;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod plot;
pub mod rate;
pub mod signal;
pub mod simulate;
pub mod utils;

pub use detectors::*;
pub use errors::{Error, Result};
pub use metrics::*;
pub use signal::*;

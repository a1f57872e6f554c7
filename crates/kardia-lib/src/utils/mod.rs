//! Artefact and segmentation utilities around detected events.

pub mod clean;
pub mod epochs;
pub mod segments;
pub mod triggers;

pub use clean::{find_clipping, nan_cleaning};
pub use epochs::{scan_triggers, to_epochs, EpochConfig};
pub use segments::{get_valid_segments, norm_bad_segments, SegmentSpec};
pub use triggers::{norm_triggers, time_shift, to_angles, to_neighbour, Direction, NeighbourKind};

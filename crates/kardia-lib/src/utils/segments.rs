//! Bad-segment normalization and valid-segment extraction.

use crate::errors::{Error, Result};

/// Bad segments, either as explicit `(start, end)` index pairs or as a
/// boolean rejection mask.
#[derive(Debug, Clone, Copy)]
pub enum SegmentSpec<'a> {
    Intervals(&'a [(usize, usize)]),
    Mask(&'a [bool]),
}

/// Normalize bad segments: merge overlapping or adjacent intervals and
/// return them sorted. Mask input is converted to its runs of `true`.
pub fn norm_bad_segments(spec: SegmentSpec<'_>) -> Result<Vec<(usize, usize)>> {
    let mut segments: Vec<(usize, usize)> = match spec {
        SegmentSpec::Intervals(intervals) => {
            for &(start, end) in intervals {
                if start >= end {
                    return Err(Error::InvalidArgument(format!(
                        "bad segment ({start}, {end}) is empty or inverted"
                    )));
                }
            }
            intervals.to_vec()
        }
        SegmentSpec::Mask(mask) => mask_to_runs(mask),
    };

    segments.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(segments.len());
    for (start, end) in segments {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => {
                *last_end = (*last_end).max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    Ok(merged)
}

fn mask_to_runs(mask: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &bad) in mask.iter().enumerate() {
        match (bad, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, mask.len()));
    }
    runs
}

/// The sub-slices of `signal` complementary to the normalized bad segments,
/// longest first (ties keep their left-to-right order).
pub fn get_valid_segments<'a>(
    signal: &'a [f64],
    bad_segments: &[(usize, usize)],
) -> Result<Vec<&'a [f64]>> {
    let normalized = norm_bad_segments(SegmentSpec::Intervals(bad_segments))?;

    let mut valid: Vec<&[f64]> = Vec::new();
    let mut cursor = 0usize;
    for (start, end) in normalized {
        let start = start.min(signal.len());
        if start > cursor {
            valid.push(&signal[cursor..start]);
        }
        cursor = cursor.max(end.min(signal.len()));
    }
    if cursor < signal.len() {
        valid.push(&signal[cursor..]);
    }

    valid.sort_by(|a, b| b.len().cmp(&a.len()));
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_overlapping_intervals() {
        let merged = norm_bad_segments(SegmentSpec::Intervals(&[(100, 200), (150, 250)])).unwrap();
        assert_eq!(merged, vec![(100, 250)]);
    }

    #[test]
    fn normalizes_a_boolean_mask() {
        let mut mask = vec![false; 100];
        for i in 10..20 {
            mask[i] = true;
        }
        for i in 50..60 {
            mask[i] = true;
        }
        let segments = norm_bad_segments(SegmentSpec::Mask(&mask)).unwrap();
        assert_eq!(segments, vec![(10, 20), (50, 60)]);
    }

    #[test]
    fn adjacent_intervals_merge() {
        let merged = norm_bad_segments(SegmentSpec::Intervals(&[(30, 40), (40, 55)])).unwrap();
        assert_eq!(merged, vec![(30, 55)]);
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let merged = norm_bad_segments(SegmentSpec::Intervals(&[(500, 550), (100, 140)])).unwrap();
        assert_eq!(merged, vec![(100, 140), (500, 550)]);
    }

    #[test]
    fn inverted_interval_is_rejected() {
        assert!(matches!(
            norm_bad_segments(SegmentSpec::Intervals(&[(200, 100)])),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn valid_segments_complement_bad_ones() {
        let signal: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let valid = get_valid_segments(&signal, &[(500, 550), (700, 800)]).unwrap();
        let lengths: Vec<usize> = valid.iter().map(|s| s.len()).collect();
        assert_eq!(lengths, vec![500, 200, 150]);
        // Values are preserved, not copied from elsewhere.
        assert_eq!(valid[0][0], 0.0);
        assert_eq!(valid[1][0], 800.0);
        assert_eq!(valid[2][0], 550.0);
    }

    #[test]
    fn mask_run_reaching_the_end_is_closed() {
        let mut mask = vec![false; 10];
        for i in 7..10 {
            mask[i] = true;
        }
        let segments = norm_bad_segments(SegmentSpec::Mask(&mask)).unwrap();
        assert_eq!(segments, vec![(7, 10)]);
    }

    #[test]
    fn no_bad_segments_returns_the_whole_signal() {
        let signal = vec![1.0; 64];
        let valid = get_valid_segments(&signal, &[]).unwrap();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].len(), 64);
    }
}

//! Backend-independent figure descriptions.
//!
//! The library never renders anything; it hands a serializable [`Figure`] to
//! whichever [`PlotBackend`] the caller plugs in.

use crate::errors::Result as KardiaResult;
use crate::signal::{peaks_to_idx, EventSeries};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Marker(MarkerSeries),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }
}

/// Rendering seam; implementations live outside this crate.
pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

/// Heart-rate curve over its time grid; NaN gaps are dropped.
pub fn rate_figure(rate: &[f64], time: &[f64], label: &str) -> Figure {
    let points: Vec<[f64; 2]> = time
        .iter()
        .zip(rate)
        .filter(|(_, r)| !r.is_nan())
        .map(|(&t, &r)| [t, r])
        .collect();
    let mut fig = Figure::new(Some("Instantaneous heart rate".into()));
    fig.y.label = Some(label.into());
    fig.x.label = Some("time (s)".into());
    fig.add_series(Series::Line(LineSeries {
        name: label.into(),
        points: decimate_points(&points, 2048),
        style: Style {
            width: 2.0,
            dash: None,
            color: Color(0xFF0077),
        },
    }));
    fig
}

/// Raw waveform with event markers from any representation.
pub fn events_figure(signal: &[f64], sfreq: f64, events: &EventSeries) -> KardiaResult<Figure> {
    let dt = 1.0 / sfreq.max(1.0);
    let wave: Vec<[f64; 2]> = signal
        .iter()
        .enumerate()
        .map(|(i, &v)| [i as f64 * dt, v])
        .collect();
    let idx = match events {
        EventSeries::Peaks(p) => peaks_to_idx(p),
        other => other.to_peaks_idx()?,
    };
    let markers: Vec<[f64; 2]> = idx
        .iter()
        .filter(|&&i| i < signal.len())
        .map(|&i| [i as f64 * dt, signal[i]])
        .collect();

    let mut fig = Figure::new(Some("Detected events".into()));
    fig.x.label = Some("time (s)".into());
    fig.add_series(Series::Line(LineSeries {
        name: "signal".into(),
        points: decimate_points(&wave, 4096),
        style: Style {
            width: 1.4,
            dash: None,
            color: Color(0x2266AA),
        },
    }));
    fig.add_series(Series::Marker(MarkerSeries {
        name: "events".into(),
        points: markers,
        style: Style {
            width: 3.0,
            dash: None,
            color: Color(0xFF0077),
        },
    }));
    Ok(fig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimation_caps_the_point_count() {
        let points: Vec<[f64; 2]> = (0..10_000).map(|i| [i as f64, 0.0]).collect();
        let decimated = decimate_points(&points, 1024);
        assert!(decimated.len() <= 1024);
        assert_eq!(decimated[0], [0.0, 0.0]);
    }

    #[test]
    fn rate_figure_skips_nan_samples() {
        let rate = [f64::NAN, 810.0, 805.0, f64::NAN];
        let time = [0.0, 0.001, 0.002, 0.003];
        let fig = rate_figure(&rate, &time, "rr (ms)");
        let Series::Line(line) = &fig.series[0] else {
            panic!("expected a line series");
        };
        assert_eq!(line.points.len(), 2);
    }

    #[test]
    fn events_figure_marks_peak_samples() {
        let signal: Vec<f64> = (0..100).map(|i| (i as f64 * 0.3).sin()).collect();
        let mut peaks = vec![false; 100];
        peaks[5] = true;
        peaks[47] = true;
        let fig = events_figure(&signal, 100.0, &EventSeries::Peaks(peaks)).unwrap();
        let Series::Marker(markers) = &fig.series[1] else {
            panic!("expected a marker series");
        };
        assert_eq!(markers.points.len(), 2);
        assert_eq!(markers.points[0][1], signal[5]);
    }

    #[test]
    fn figures_serialize_to_json_and_back() {
        let fig = rate_figure(&[800.0, 805.0], &[0.0, 0.001], "rr (ms)");
        let json = serde_json::to_string(&fig).unwrap();
        let back: Figure = serde_json::from_str(&json).unwrap();
        assert_eq!(back.series.len(), fig.series.len());
        assert_eq!(back.title, fig.title);
    }
}

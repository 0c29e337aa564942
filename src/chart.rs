use crate::format::format_time;
use crate::metrics::Snapshot;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("chart expects {expected} series, got {actual}")]
    SeriesCount { expected: usize, actual: usize },
    #[error("series {index} has {actual} points but there are {labels} labels")]
    LengthMismatch {
        index: usize,
        actual: usize,
        labels: usize,
    },
}

/// Display options fixed at chart creation.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: &'static str,
    pub y_axis_title: &'static str,
    pub series_labels: Vec<&'static str>,
    pub begin_at_zero: bool,
    pub legend: bool,
}

impl ChartSpec {
    pub fn signal() -> Self {
        Self {
            title: "Signal strength",
            y_axis_title: "dBm",
            series_labels: vec!["RSSI (dBm)"],
            begin_at_zero: false,
            legend: true,
        }
    }

    pub fn latency() -> Self {
        Self {
            title: "Latency",
            y_axis_title: "ms",
            series_labels: vec!["Router (ms)", "Linux (ms)"],
            begin_at_zero: true,
            legend: true,
        }
    }
}

/// A line chart: time labels plus one or more index-aligned series.
#[derive(Debug, Clone)]
pub struct ChartModel {
    spec: ChartSpec,
    labels: Vec<String>,
    series: Vec<Vec<Option<f64>>>,
    revision: u64,
}

impl ChartModel {
    pub fn new(spec: ChartSpec) -> Self {
        let series = vec![Vec::new(); spec.series_labels.len()];
        Self {
            spec,
            labels: Vec::new(),
            series,
            revision: 0,
        }
    }

    pub fn spec(&self) -> &ChartSpec {
        &self.spec
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn series(&self) -> &[Vec<Option<f64>>] {
        &self.series
    }

    /// Bumped by every [`redraw`](Self::redraw).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Swaps labels and every series at once. On error the chart is unchanged.
    pub fn replace(
        &mut self,
        labels: Vec<String>,
        series: Vec<Vec<Option<f64>>>,
    ) -> Result<(), ChartError> {
        if series.len() != self.spec.series_labels.len() {
            return Err(ChartError::SeriesCount {
                expected: self.spec.series_labels.len(),
                actual: series.len(),
            });
        }
        if let Some((index, s)) = series.iter().enumerate().find(|(_, s)| s.len() != labels.len()) {
            return Err(ChartError::LengthMismatch {
                index,
                actual: s.len(),
                labels: labels.len(),
            });
        }
        self.labels = labels;
        self.series = series;
        Ok(())
    }

    pub fn redraw(&mut self) {
        self.revision += 1;
    }

    /// `(x, y)` points for plotting series `index`, skipping gaps.
    pub fn points(&self, index: usize) -> Vec<(f64, f64)> {
        self.series()
            .get(index)
            .map(|s| {
                s.iter()
                    .enumerate()
                    .filter_map(|(x, y)| (*y).filter(|v| v.is_finite()).map(|v| (x as f64, v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Min and max over every present value, widened so the range is never empty.
    pub fn y_bounds(&self) -> [f64; 2] {
        let values = self.series.iter().flatten().filter_map(|v| *v).filter(|v| v.is_finite());
        let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if lo > hi {
            (lo, hi) = (0.0, 1.0);
        }
        if self.spec.begin_at_zero {
            lo = lo.min(0.0);
        }
        if hi - lo < 1.0 {
            hi = lo + 1.0;
        }
        [lo, hi]
    }
}

/// One history response reshaped into chart columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFrame {
    pub labels: Vec<String>,
    pub rssi: Vec<Option<f64>>,
    pub router_ms: Vec<Option<f64>>,
    pub linux_ms: Vec<Option<f64>>,
}

impl HistoryFrame {
    pub fn from_series(series: &[Snapshot]) -> Self {
        Self {
            labels: series.iter().map(|p| format_time(p.ts.as_deref())).collect(),
            rssi: series.iter().map(|p| p.rssi).collect(),
            router_ms: series.iter().map(|p| p.router_ms).collect(),
            linux_ms: series.iter().map(|p| p.linux_ms).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

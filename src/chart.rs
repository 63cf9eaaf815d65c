// Chart model for the history panel
//
// HistoryChart is what the terminal draws: plain numbers and labels, no widget
// types, so it can be built and checked without a terminal. ChartSlot owns the
// one chart on screen and disposes the old one before attaching a new one.

use crate::history::HistoricalSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryChart {
    pub title: String,
    pub dataset_label: String,
    pub labels: Vec<String>,
    /// (index, rate), x runs 0..len
    pub points: Vec<(f64, f64)>,
    pub y_bounds: [f64; 2],
    pub simulated: bool,
}

impl HistoryChart {
    pub fn from_series(series: &HistoricalSeries) -> Self {
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.rate))
            .collect();

        let y_bounds = match series.bounds() {
            Some((lo, hi)) => {
                // Flat series still needs a visible band
                let pad = ((hi - lo) * 0.1).max(hi.abs() * 0.001);
                [lo - pad, hi + pad]
            }
            None => [0.0, 1.0],
        };

        HistoryChart {
            title: series.title(),
            dataset_label: format!("{} Exchange Rate", series.pair.label()),
            labels: series.points.iter().map(|p| p.label.clone()).collect(),
            points,
            y_bounds,
            simulated: series.is_simulated(),
        }
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.points.len().saturating_sub(1)).max(1) as f64]
    }

    /// First, middle and last date labels for the x axis
    pub fn axis_labels(&self) -> Vec<String> {
        match self.labels.len() {
            0 => Vec::new(),
            1 | 2 => self.labels.clone(),
            n => vec![
                self.labels[0].clone(),
                self.labels[n / 2].clone(),
                self.labels[n - 1].clone(),
            ],
        }
    }
}

/// Exclusive owner of the chart currently on screen
#[derive(Debug, Default)]
pub struct ChartSlot {
    current: Option<HistoryChart>,
    disposed: u64,
}

impl ChartSlot {
    pub fn attach(&mut self, chart: HistoryChart) {
        self.dispose();
        self.current = Some(chart);
    }

    pub fn dispose(&mut self) {
        if let Some(old) = self.current.take() {
            self.disposed += 1;
            log::debug!("Disposed chart '{}'", old.title);
        }
    }

    pub fn current(&self) -> Option<&HistoryChart> {
        self.current.as_ref()
    }

    /// How many charts this slot has released
    pub fn disposed_count(&self) -> u64 {
        self.disposed
    }
}

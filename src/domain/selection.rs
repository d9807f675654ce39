// Caller-held filter state
use serde::Serialize;

/// Inclusive row-index bounds over the time-sorted candidate rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// The user's current filter choices.
///
/// `None` means "use the default"; `Some(vec![])` is an explicit empty
/// selection and filters everything out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    pub metrics: Option<Vec<String>>,
    pub devices: Option<Vec<String>>,
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub series_metric: Option<String>,
}

impl FilterSelection {
    pub fn with_metrics<S: Into<String>>(mut self, metrics: impl IntoIterator<Item = S>) -> Self {
        self.metrics = Some(metrics.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_devices<S: Into<String>>(mut self, devices: impl IntoIterator<Item = S>) -> Self {
        self.devices = Some(devices.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_range(mut self, start: usize, end: usize) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_series_metric(mut self, metric: impl Into<String>) -> Self {
        self.series_metric = Some(metric.into());
        self
    }
}

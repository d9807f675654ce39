// Dashboard domain model
use super::reading::TimeValue;
use super::selection::RowRange;
use serde::Serialize;

/// Controls the presentation layer renders as selectable filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterPanel {
    pub metric_options: Vec<String>,
    pub metric_defaults: Vec<String>,
    pub selected_metrics: Vec<String>,
    pub device_options: Vec<String>,
    pub device_defaults: Vec<String>,
    pub selected_devices: Vec<String>,
    /// Rows left after metric and device filtering.
    pub candidate_rows: usize,
    /// Applied row range, absent when there were too few rows to choose one.
    pub range: Option<RowRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub readings: usize,
    pub devices: usize,
    pub outlier_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub timestamp_utc: TimeValue,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp_utc: TimeValue, value: f64) -> Self {
        Self {
            timestamp_utc,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub metric: Option<String>,
    /// Metrics present in the filtered view that the series may be switched to.
    pub metric_options: Vec<String>,
    /// Point count before downsampling.
    pub total_points: usize,
    pub points: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    pub values: Vec<f64>,
    pub out_of_range: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricOutlierRow {
    pub metric_type: String,
    pub n_readings: usize,
    pub n_outliers: usize,
    /// `None` for a metric with no readings; serialised as `null`.
    pub outlier_rate: Option<f64>,
}

/// A widget either has data to draw or a message to show in its place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Widget<T> {
    Ready { data: T },
    Placeholder { message: String },
}

impl<T> Widget<T> {
    pub fn ready(data: T) -> Self {
        Widget::Ready { data }
    }

    pub fn placeholder(message: impl Into<String>) -> Self {
        Widget::Placeholder {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardWidgets {
    pub summary: Widget<Summary>,
    pub time_series: Widget<TimeSeries>,
    pub histogram: Widget<Histogram>,
    pub outlier_table: Widget<Vec<MetricOutlierRow>>,
}

impl DashboardWidgets {
    pub const IDS: [&'static str; 4] = ["summary", "time_series", "histogram", "outlier_table"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DashboardView {
    Ready {
        title: String,
        filters: FilterPanel,
        widgets: DashboardWidgets,
    },
    /// Too few rows to choose a range; widgets show the empty view.
    InsufficientData {
        title: String,
        filters: FilterPanel,
        message: String,
        widgets: DashboardWidgets,
    },
}

impl DashboardView {
    pub fn filters(&self) -> &FilterPanel {
        match self {
            DashboardView::Ready { filters, .. } => filters,
            DashboardView::InsufficientData { filters, .. } => filters,
        }
    }

    pub fn widgets(&self) -> &DashboardWidgets {
        match self {
            DashboardView::Ready { widgets, .. } => widgets,
            DashboardView::InsufficientData { widgets, .. } => widgets,
        }
    }
}

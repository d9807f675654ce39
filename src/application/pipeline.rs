// Filter & aggregation pipeline - pure functions over the cached dataset
use crate::domain::dashboard::{
    FilterPanel, Histogram, HistogramBin, MetricOutlierRow, Summary, TimeSeries, TimeSeriesPoint,
};
use crate::domain::reading::{Dataset, Reading};
use crate::domain::selection::{FilterSelection, RowRange};
use std::collections::BTreeSet;

/// Tunables for the aggregation steps.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub histogram_bins: usize,
    pub value_min: f64,
    pub value_max: f64,
    /// Series length cap; 0 returns every point.
    pub max_series_points: usize,
    pub default_excluded_metrics: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            histogram_bins: 30,
            value_min: 0.0,
            value_max: 100.0,
            max_series_points: 0,
            default_excluded_metrics: vec!["fault".to_string()],
        }
    }
}

/// Result of one pipeline pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome<'a> {
    /// Fewer than two candidate rows; no range can be chosen.
    InsufficientData { filters: FilterPanel },
    Filtered {
        filters: FilterPanel,
        view: Vec<&'a Reading>,
    },
}

/// Sorted distinct non-missing metric types of `rows`.
pub fn metric_options<'a>(rows: impl IntoIterator<Item = &'a Reading>) -> Vec<String> {
    distinct(rows.into_iter().filter_map(|r| r.metric_type.as_deref()))
}

/// Sorted distinct non-missing device ids of `rows`.
pub fn device_options<'a>(rows: impl IntoIterator<Item = &'a Reading>) -> Vec<String> {
    distinct(rows.into_iter().filter_map(|r| r.device_id.as_deref()))
}

fn distinct<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<String> {
    labels
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Every option except the excluded ones, or every option if that leaves nothing.
pub fn default_metrics(options: &[String], excluded: &[String]) -> Vec<String> {
    let kept: Vec<String> = options
        .iter()
        .filter(|m| !excluded.contains(m))
        .cloned()
        .collect();
    if kept.is_empty() {
        options.to_vec()
    } else {
        kept
    }
}

/// Resolve a requested selection against the available options.
///
/// `None` takes the defaults; unknown values are dropped.
fn resolve_selection(
    requested: Option<&[String]>,
    options: &[String],
    defaults: &[String],
    kind: &str,
) -> Vec<String> {
    match requested {
        None => defaults.to_vec(),
        Some(values) => {
            let (known, unknown): (Vec<&String>, Vec<&String>) =
                values.iter().partition(|v| options.contains(v));
            if !unknown.is_empty() {
                tracing::debug!("Ignoring unknown {} selection: {:?}", kind, unknown);
            }
            known.into_iter().cloned().collect()
        }
    }
}

fn label_in(label: &Option<String>, selected: &[String]) -> bool {
    label.as_ref().is_some_and(|l| selected.contains(l))
}

/// Stable ascending sort by `timestamp_utc`; equal timestamps keep row order.
pub fn sort_by_time(rows: &mut [&Reading]) {
    rows.sort_by(|a, b| a.timestamp_utc.cmp(&b.timestamp_utc));
}

/// Clamp a requested row range to `0..=rows-1`. `rows` must be at least 2.
pub fn clamp_range(start: Option<usize>, end: Option<usize>, rows: usize) -> RowRange {
    let last = rows.saturating_sub(1);
    RowRange::new(start.unwrap_or(0).min(last), end.unwrap_or(last).min(last))
}

/// Run the cascading filter: metric, then device, then row range.
///
/// Metric options come from the whole dataset and device options from the
/// metric-filtered rows. The row range indexes the time-sorted candidates and
/// is inclusive on both ends; `start > end` selects nothing.
pub fn apply_filters<'a>(
    dataset: &'a Dataset,
    selection: &FilterSelection,
    settings: &PipelineSettings,
) -> PipelineOutcome<'a> {
    let metric_options = metric_options(dataset.readings());
    let metric_defaults = default_metrics(&metric_options, &settings.default_excluded_metrics);
    let selected_metrics = resolve_selection(
        selection.metrics.as_deref(),
        &metric_options,
        &metric_defaults,
        "metric",
    );

    let by_metric: Vec<&Reading> = dataset
        .readings()
        .iter()
        .filter(|r| label_in(&r.metric_type, &selected_metrics))
        .collect();

    let device_options = device_options(by_metric.iter().copied());
    let device_defaults = device_options.clone();
    let selected_devices = resolve_selection(
        selection.devices.as_deref(),
        &device_options,
        &device_defaults,
        "device",
    );

    let mut candidates: Vec<&Reading> = by_metric
        .into_iter()
        .filter(|r| label_in(&r.device_id, &selected_devices))
        .collect();

    let mut filters = FilterPanel {
        metric_options,
        metric_defaults,
        selected_metrics,
        device_options,
        device_defaults,
        selected_devices,
        candidate_rows: candidates.len(),
        range: None,
    };

    if candidates.len() < 2 {
        tracing::debug!(
            "Only {} candidate rows after metric/device filtering",
            candidates.len()
        );
        return PipelineOutcome::InsufficientData { filters };
    }

    sort_by_time(&mut candidates);
    let range = clamp_range(selection.start, selection.end, candidates.len());
    filters.range = Some(range);

    let view = if range.start > range.end {
        Vec::new()
    } else {
        candidates[range.start..=range.end].to_vec()
    };

    PipelineOutcome::Filtered { filters, view }
}

/// Row count, distinct devices and overall outlier rate (0 for an empty view).
pub fn summarize(view: &[&Reading]) -> Summary {
    let readings = view.len();
    let devices = view
        .iter()
        .filter_map(|r| r.device_id.as_deref())
        .collect::<BTreeSet<_>>()
        .len();
    let outliers = view.iter().filter(|r| r.is_outlier()).count();
    let outlier_rate = if readings == 0 {
        0.0
    } else {
        outliers as f64 / readings as f64
    };

    Summary {
        readings,
        devices,
        outlier_rate,
    }
}

/// Points of one metric sorted by time.
///
/// The requested metric is used only when present in the view; otherwise the
/// first present metric is chosen. Rows without a value are skipped.
pub fn time_series(view: &[&Reading], requested: Option<&str>, max_points: usize) -> TimeSeries {
    let metric_options = metric_options(view.iter().copied());
    let metric = requested
        .filter(|m| metric_options.iter().any(|o| o == m))
        .map(str::to_string)
        .or_else(|| metric_options.first().cloned());

    let Some(metric) = metric else {
        return TimeSeries {
            metric: None,
            metric_options,
            total_points: 0,
            points: Vec::new(),
        };
    };

    let mut rows: Vec<&Reading> = view
        .iter()
        .copied()
        .filter(|r| r.metric_type.as_deref() == Some(metric.as_str()))
        .collect();
    sort_by_time(&mut rows);

    let points: Vec<TimeSeriesPoint> = rows
        .into_iter()
        .filter_map(|r| {
            r.scaled_value
                .map(|v| TimeSeriesPoint::new(r.timestamp_utc.clone(), v))
        })
        .collect();
    let total_points = points.len();

    TimeSeries {
        metric: Some(metric),
        metric_options,
        total_points,
        points: downsample_points(points, max_points),
    }
}

/// Downsample by bucket averaging, keeping each bucket's middle timestamp.
pub fn downsample_points(points: Vec<TimeSeriesPoint>, max_points: usize) -> Vec<TimeSeriesPoint> {
    if max_points == 0 || points.len() <= max_points {
        return points;
    }

    let bucket_size = points.len().div_ceil(max_points);
    points
        .chunks(bucket_size)
        .map(|chunk| {
            let mid = &chunk[chunk.len() / 2];
            let avg = chunk.iter().map(|p| p.value).sum::<f64>() / chunk.len() as f64;
            TimeSeriesPoint::new(mid.timestamp_utc.clone(), avg)
        })
        .collect()
}

/// Equal-width histogram over `[min, max]`; the last bin is closed on the right.
///
/// With no bins or an empty scale nothing is binned and every value is out of range.
pub fn histogram(view: &[&Reading], bins: usize, min: f64, max: f64) -> Histogram {
    let values: Vec<f64> = view.iter().filter_map(|r| r.scaled_value).collect();
    if bins == 0 || max <= min {
        tracing::warn!("Histogram requested with {} bins over [{}, {}]", bins, min, max);
        return Histogram {
            bins: Vec::new(),
            out_of_range: values.len(),
            values,
        };
    }
    let width = (max - min) / bins as f64;

    let mut counts = vec![0usize; bins];
    let mut out_of_range = 0;
    for &value in &values {
        if value < min || value > max {
            out_of_range += 1;
            continue;
        }
        let idx = (((value - min) * bins as f64 / (max - min)) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count,
        })
        .collect();

    Histogram {
        bins,
        values,
        out_of_range,
    }
}

/// Outlier counts per metric over the full metric domain.
///
/// Metrics with no rows in the view keep a row with `outlier_rate: None`.
pub fn outlier_table(view: &[&Reading], metric_domain: &[String]) -> Vec<MetricOutlierRow> {
    metric_domain
        .iter()
        .map(|metric| {
            let (n_readings, n_outliers) = view
                .iter()
                .filter(|r| r.metric_type.as_deref() == Some(metric.as_str()))
                .fold((0usize, 0usize), |(n, o), r| (n + 1, o + r.is_outlier() as usize));
            let outlier_rate = (n_readings > 0).then(|| n_outliers as f64 / n_readings as f64);

            MetricOutlierRow {
                metric_type: metric.clone(),
                n_readings,
                n_outliers,
                outlier_rate,
            }
        })
        .collect()
}

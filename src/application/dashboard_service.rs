// Dashboard service - Use case for building the dashboard view for one filter selection
use crate::application::dataset_service::DatasetService;
use crate::application::pipeline::{self, PipelineOutcome, PipelineSettings};
use crate::domain::dashboard::{DashboardView, DashboardWidgets, Widget};
use crate::domain::reading::{Dataset, Reading};
use crate::domain::selection::FilterSelection;
use std::sync::Arc;

pub const DASHBOARD_TITLE: &str = "Greenhouse Sensor EDA Dashboard";
pub const INSUFFICIENT_DATA_MESSAGE: &str =
    "Not enough data for the selected filters to choose a time range.";
pub const EMPTY_VIEW_MESSAGE: &str = "No data for the current filters.";
pub const EMPTY_SERIES_MESSAGE: &str = "No rows for the selected metric.";
pub const EMPTY_HISTOGRAM_MESSAGE: &str = "No data to show histogram.";

#[derive(Clone)]
pub struct DashboardService {
    datasets: DatasetService,
    settings: PipelineSettings,
}

impl DashboardService {
    pub fn new(datasets: DatasetService, settings: PipelineSettings) -> Self {
        Self { datasets, settings }
    }

    pub async fn dataset(&self) -> anyhow::Result<Arc<Dataset>> {
        self.datasets.dataset().await
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn get_dashboard(&self, selection: &FilterSelection) -> anyhow::Result<DashboardView> {
        let dataset = self.dataset().await?;
        Ok(build_view(&dataset, selection, &self.settings))
    }
}

/// Run the pipeline and wrap its outputs as widgets.
pub fn build_view(
    dataset: &Dataset,
    selection: &FilterSelection,
    settings: &PipelineSettings,
) -> DashboardView {
    match pipeline::apply_filters(dataset, selection, settings) {
        PipelineOutcome::InsufficientData { filters } => DashboardView::InsufficientData {
            title: DASHBOARD_TITLE.to_string(),
            filters,
            message: INSUFFICIENT_DATA_MESSAGE.to_string(),
            widgets: build_widgets(dataset, &[], selection, settings),
        },
        PipelineOutcome::Filtered { filters, view } => {
            tracing::debug!(
                "Filtered view has {} of {} readings",
                view.len(),
                dataset.len()
            );
            DashboardView::Ready {
                title: DASHBOARD_TITLE.to_string(),
                filters,
                widgets: build_widgets(dataset, &view, selection, settings),
            }
        }
    }
}

pub fn build_widgets(
    dataset: &Dataset,
    view: &[&Reading],
    selection: &FilterSelection,
    settings: &PipelineSettings,
) -> DashboardWidgets {
    let summary = Widget::ready(pipeline::summarize(view));

    let time_series = if view.is_empty() {
        Widget::placeholder(EMPTY_VIEW_MESSAGE)
    } else {
        let series = pipeline::time_series(
            view,
            selection.series_metric.as_deref(),
            settings.max_series_points,
        );
        if series.points.is_empty() {
            Widget::placeholder(EMPTY_SERIES_MESSAGE)
        } else {
            Widget::ready(series)
        }
    };

    let histogram = if view.is_empty() {
        Widget::placeholder(EMPTY_HISTOGRAM_MESSAGE)
    } else {
        Widget::ready(pipeline::histogram(
            view,
            settings.histogram_bins,
            settings.value_min,
            settings.value_max,
        ))
    };

    let outlier_table = Widget::ready(pipeline::outlier_table(view, dataset.metric_domain()));

    DashboardWidgets {
        summary,
        time_series,
        histogram,
        outlier_table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dashboard::Summary;
    use crate::domain::reading::{TimeAxis, TimeValue};

    fn reading(ts: i64, metric: &str, device: &str, value: Option<f64>, outlier: &str) -> Reading {
        Reading::new(
            TimeValue::Ordinal(ts),
            Some(metric.to_string()),
            Some(device.to_string()),
            value,
            Some(outlier.to_string()),
        )
    }

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                reading(0, "current", "a", Some(10.0), "none"),
                reading(1, "current", "b", Some(20.0), "spike"),
                reading(2, "fault", "a", Some(30.0), "none"),
                reading(3, "fault", "c", Some(40.0), "none"),
                reading(4, "sensor_battery_level", "a", None, "none"),
                reading(5, "sensor_battery_level", "b", None, "none"),
            ],
            TimeAxis::Ordinal,
        )
    }

    #[test]
    fn test_default_view_is_ready() {
        let view = build_view(&dataset(), &FilterSelection::default(), &PipelineSettings::default());

        let DashboardView::Ready { filters, widgets, .. } = view else {
            panic!("expected ready view");
        };
        assert_eq!(filters.selected_metrics, ["current", "sensor_battery_level"]);
        assert!(matches!(widgets.summary, Widget::Ready { .. }));
        assert!(matches!(widgets.time_series, Widget::Ready { .. }));
        assert!(matches!(widgets.histogram, Widget::Ready { .. }));

        let Widget::Ready { data: table } = widgets.outlier_table else {
            panic!("expected outlier table");
        };
        let fault = table.iter().find(|r| r.metric_type == "fault").unwrap();
        assert_eq!(fault.n_readings, 0);
        assert_eq!(fault.outlier_rate, None);
    }

    #[test]
    fn test_series_without_values_gets_placeholder() {
        let selection = FilterSelection::default()
            .with_metrics(["sensor_battery_level"])
            .with_series_metric("sensor_battery_level");
        let view = build_view(&dataset(), &selection, &PipelineSettings::default());

        let DashboardView::Ready { widgets, .. } = view else {
            panic!("expected ready view");
        };
        assert_eq!(widgets.time_series, Widget::placeholder(EMPTY_SERIES_MESSAGE));
    }

    #[test]
    fn test_empty_range_gets_placeholders() {
        let selection = FilterSelection::default().with_range(2, 0);
        let view = build_view(&dataset(), &selection, &PipelineSettings::default());

        let DashboardView::Ready { widgets, .. } = view else {
            panic!("expected ready view");
        };
        assert_eq!(widgets.time_series, Widget::placeholder(EMPTY_VIEW_MESSAGE));
        assert_eq!(widgets.histogram, Widget::placeholder(EMPTY_HISTOGRAM_MESSAGE));
        let Widget::Ready { data: summary } = widgets.summary else {
            panic!("summary is always ready");
        };
        assert_eq!(summary.readings, 0);
        assert_eq!(summary.outlier_rate, 0.0);
    }

    #[test]
    fn test_insufficient_data_view() {
        let selection = FilterSelection::default().with_metrics(Vec::<String>::new());
        let view = build_view(&dataset(), &selection, &PipelineSettings::default());

        assert!(matches!(view, DashboardView::InsufficientData { .. }));
        assert_eq!(view.filters().candidate_rows, 0);

        let widgets = view.widgets();
        assert_eq!(
            widgets.summary,
            Widget::ready(Summary {
                readings: 0,
                devices: 0,
                outlier_rate: 0.0,
            })
        );
        assert_eq!(widgets.time_series, Widget::placeholder(EMPTY_VIEW_MESSAGE));
        assert_eq!(widgets.histogram, Widget::placeholder(EMPTY_HISTOGRAM_MESSAGE));
        let Widget::Ready { data: table } = &widgets.outlier_table else {
            panic!("outlier table is always ready");
        };
        assert_eq!(table.len(), 3);
        assert!(table.iter().all(|row| row.n_readings == 0 && row.outlier_rate.is_none()));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert!(json["widgets"]["outlier_table"]["data"][0]["outlier_rate"].is_null());
    }

    #[test]
    fn test_view_serializes_nan_rate_as_null() {
        let view = build_view(&dataset(), &FilterSelection::default(), &PipelineSettings::default());
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "ready");
        let rows = json["widgets"]["outlier_table"]["data"].as_array().unwrap();
        let fault = rows.iter().find(|r| r["metric_type"] == "fault").unwrap();
        assert!(fault["outlier_rate"].is_null());
        let current = rows.iter().find(|r| r["metric_type"] == "current").unwrap();
        assert_eq!(current["outlier_rate"], 0.5);
    }
}

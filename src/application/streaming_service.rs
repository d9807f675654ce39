// Streaming dashboard service - Progressive loading, one message per widget
use crate::application::dashboard_service::{
    DASHBOARD_TITLE, DashboardService, INSUFFICIENT_DATA_MESSAGE, build_widgets,
};
use crate::application::pipeline::{self, PipelineOutcome};
use crate::domain::dashboard::{
    DashboardWidgets, FilterPanel, Histogram, MetricOutlierRow, Summary, TimeSeries, Widget,
};
use crate::domain::selection::FilterSelection;
use futures::stream::Stream;
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "id", content = "widget", rename_all = "snake_case")]
pub enum WidgetUpdate {
    Summary(Widget<Summary>),
    TimeSeries(Widget<TimeSeries>),
    Histogram(Widget<Histogram>),
    OutlierTable(Widget<Vec<MetricOutlierRow>>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Skeleton {
        title: String,
        filters: FilterPanel,
        /// Widget ids that will follow.
        widgets: Vec<String>,
        message: Option<String>,
    },
    WidgetUpdate(WidgetUpdate),
    Complete {
        widgets: usize,
        duration_ms: u64,
    },
}

#[derive(Clone)]
pub struct StreamingDashboardService {
    dashboards: DashboardService,
}

impl StreamingDashboardService {
    pub fn new(dashboards: DashboardService) -> Self {
        Self { dashboards }
    }

    /// Skeleton first, then each widget, then a completion event.
    pub async fn stream_dashboard(
        &self,
        selection: FilterSelection,
    ) -> anyhow::Result<impl Stream<Item = StreamMessage> + Send + 'static> {
        let start_time = Instant::now();
        let dataset = self.dashboards.dataset().await?;
        let settings = self.dashboards.settings().clone();

        let (skeleton, updates) = match pipeline::apply_filters(&dataset, &selection, &settings) {
            PipelineOutcome::InsufficientData { filters } => {
                tracing::debug!("Streaming insufficient-data skeleton");
                let widgets = build_widgets(&dataset, &[], &selection, &settings);
                (
                    StreamMessage::Skeleton {
                        title: DASHBOARD_TITLE.to_string(),
                        filters,
                        widgets: widget_ids(),
                        message: Some(INSUFFICIENT_DATA_MESSAGE.to_string()),
                    },
                    split_widgets(widgets),
                )
            }
            PipelineOutcome::Filtered { filters, view } => {
                let widgets = build_widgets(&dataset, &view, &selection, &settings);
                (
                    StreamMessage::Skeleton {
                        title: DASHBOARD_TITLE.to_string(),
                        filters,
                        widgets: widget_ids(),
                        message: None,
                    },
                    split_widgets(widgets),
                )
            }
        };

        Ok(async_stream::stream! {
            yield skeleton;

            let total_widgets = updates.len();
            for update in updates {
                yield StreamMessage::WidgetUpdate(update);
            }

            yield StreamMessage::Complete {
                widgets: total_widgets,
                duration_ms: start_time.elapsed().as_millis() as u64,
            };
        })
    }
}

fn widget_ids() -> Vec<String> {
    DashboardWidgets::IDS.iter().map(|s| s.to_string()).collect()
}

fn split_widgets(widgets: DashboardWidgets) -> Vec<WidgetUpdate> {
    vec![
        WidgetUpdate::Summary(widgets.summary),
        WidgetUpdate::TimeSeries(widgets.time_series),
        WidgetUpdate::Histogram(widgets.histogram),
        WidgetUpdate::OutlierTable(widgets.outlier_table),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dataset_service::DatasetService;
    use crate::application::dataset_source::DatasetSource;
    use crate::application::pipeline::PipelineSettings;
    use crate::domain::raw_table::RawTable;
    use async_trait::async_trait;
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::Arc;

    struct FixtureSource;

    #[async_trait]
    impl DatasetSource for FixtureSource {
        fn describe(&self) -> String {
            "fixture".to_string()
        }

        async fn load_raw(&self) -> anyhow::Result<RawTable> {
            let records = json!([
                {"ts_utc": "2024-03-05T12:00:00Z", "dt": "current", "ref_d": "a", "v": 10.0, "outlier_type": "none"},
                {"ts_utc": "2024-03-05T12:01:00Z", "dt": "current", "ref_d": "b", "v": 20.0, "outlier_type": "spike"},
                {"ts_utc": "2024-03-05T12:02:00Z", "dt": "fault", "ref_d": "a", "v": 0.0, "outlier_type": "none"},
            ]);
            Ok(RawTable::from_records(
                records
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|r| r.as_object().cloned().unwrap())
                    .collect(),
            ))
        }
    }

    fn service() -> StreamingDashboardService {
        let datasets = DatasetService::new(Arc::new(FixtureSource));
        StreamingDashboardService::new(DashboardService::new(datasets, PipelineSettings::default()))
    }

    #[tokio::test]
    async fn test_stream_order() {
        let stream = service()
            .stream_dashboard(FilterSelection::default())
            .await
            .unwrap();
        let messages: Vec<StreamMessage> = stream.collect().await;

        assert_eq!(messages.len(), 6);
        assert!(matches!(
            &messages[0],
            StreamMessage::Skeleton { widgets, message: None, .. } if widgets.len() == 4
        ));
        assert!(matches!(
            &messages[1],
            StreamMessage::WidgetUpdate(WidgetUpdate::Summary(Widget::Ready { .. }))
        ));
        assert!(matches!(
            &messages[5],
            StreamMessage::Complete { widgets: 4, .. }
        ));
    }

    #[tokio::test]
    async fn test_insufficient_data_stream() {
        let selection = FilterSelection::default().with_metrics(["fault"]);
        let stream = service().stream_dashboard(selection).await.unwrap();
        let messages: Vec<StreamMessage> = stream.collect().await;

        assert_eq!(messages.len(), 6);
        assert!(matches!(
            &messages[0],
            StreamMessage::Skeleton { widgets, message: Some(_), .. } if widgets.len() == 4
        ));
        assert_eq!(
            messages[1],
            StreamMessage::WidgetUpdate(WidgetUpdate::Summary(Widget::ready(Summary {
                readings: 0,
                devices: 0,
                outlier_rate: 0.0,
            })))
        );
        assert!(matches!(
            &messages[3],
            StreamMessage::WidgetUpdate(WidgetUpdate::Histogram(Widget::Placeholder { .. }))
        ));
        assert!(matches!(
            &messages[5],
            StreamMessage::Complete { widgets: 4, .. }
        ));
    }

    #[test]
    fn test_widget_update_serializes_with_id() {
        let update = WidgetUpdate::Histogram(Widget::placeholder("No data to show histogram."));
        let json = serde_json::to_value(StreamMessage::WidgetUpdate(update)).unwrap();

        assert_eq!(json["type"], "widget_update");
        assert_eq!(json["id"], "histogram");
        assert_eq!(json["widget"]["state"], "placeholder");
    }
}

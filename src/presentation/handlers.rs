// HTTP request handlers
use crate::domain::reading::TimeAxis;
use crate::domain::selection::FilterSelection;
use crate::infrastructure::chunked_json::stream_response;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Filter parameters. List values are comma-separated; an empty value is an
/// explicit empty selection, an absent one means "use the defaults".
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub metrics: Option<String>,
    pub devices: Option<String>,
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub series_metric: Option<String>,
}

impl DashboardQuery {
    pub fn into_selection(self) -> FilterSelection {
        FilterSelection {
            metrics: self.metrics.as_deref().map(split_list),
            devices: self.devices.as_deref().map(split_list),
            start: self.start,
            end: self.end,
            series_metric: self.series_metric.filter(|m| !m.is_empty()),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Serialize)]
pub struct DatasetInfo {
    pub source: String,
    pub readings: usize,
    pub metric_types: Vec<String>,
    pub devices: usize,
    pub time_axis: TimeAxis,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Describe the loaded dataset
pub async fn dataset_info(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.dataset_service.dataset().await {
        Ok(dataset) => {
            let info = DatasetInfo {
                source: state.dataset_service.source_name(),
                readings: dataset.len(),
                metric_types: dataset.metric_domain().to_vec(),
                devices: dataset.device_count(),
                time_axis: dataset.time_axis(),
            };
            respond(json_response(&info, accepts_brotli(&headers)).await)
        }
        Err(e) => {
            tracing::error!("Error loading dataset: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Build the full dashboard for the given filters
pub async fn get_dashboard(
    Query(query): Query<DashboardQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let selection = query.into_selection();
    tracing::debug!("Dashboard request: {:?}", selection);

    match state.dashboard_service.get_dashboard(&selection).await {
        Ok(view) => respond(json_response(&view, accepts_brotli(&headers)).await),
        Err(e) => {
            tracing::error!("Error building dashboard: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Stream the dashboard widget by widget (progressive loading)
pub async fn stream_dashboard(
    Query(query): Query<DashboardQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let compress = accepts_brotli(&headers);

    match state
        .streaming_service
        .stream_dashboard(query.into_selection())
        .await
    {
        Ok(stream) => stream_response(stream, compress),
        Err(e) => {
            tracing::error!("Error streaming dashboard: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn respond(result: Result<axum::response::Response, StatusCode>) -> axum::response::Response {
    match result {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::dataset_service::DatasetService;
use crate::application::streaming_service::StreamingDashboardService;

#[derive(Clone)]
pub struct AppState {
    pub dataset_service: DatasetService,
    pub dashboard_service: DashboardService,
    pub streaming_service: StreamingDashboardService,
}

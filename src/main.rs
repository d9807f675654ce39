// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::dataset_service::DatasetService;
use crate::application::streaming_service::StreamingDashboardService;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::json_dataset::JsonDatasetSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{dataset_info, get_dashboard, health_check, stream_dashboard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_dashboard_config().context("Failed to load dashboard configuration")?;

    // Create dataset source (infrastructure layer)
    let source = Arc::new(JsonDatasetSource::new(&config.dataset.path));

    // Create services (application layer)
    let dataset_service = DatasetService::new(source);
    let dashboard_service = DashboardService::new(dataset_service.clone(), config.pipeline.to_settings());
    let streaming_service = StreamingDashboardService::new(dashboard_service.clone());

    // Load the dataset up front so a missing or malformed file aborts startup
    dataset_service
        .dataset()
        .await
        .with_context(|| format!("Failed to load dataset from {}", config.dataset.path))?;

    // Create application state
    let state = Arc::new(AppState {
        dataset_service,
        dashboard_service,
        streaming_service,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/dataset", get(dataset_info))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/stream", get(stream_dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid server.bind_addr {}", config.server.bind_addr))?;
    tracing::info!("Starting greenhouse-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{Router, routing::get};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::device_service::DeviceService;
use crate::application::telemetry_service::TelemetryService;
use crate::infrastructure::config::load_config;
use crate::infrastructure::influx_repository::InfluxRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{get_telemetry, health_check, list_devices};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(InfluxRepository::new(config.influx, &config.query));

    // Create services (application layer)
    let device_service = DeviceService::new(repository.clone());
    let telemetry_service = TelemetryService::new(repository, config.query.timeout());

    let state = Arc::new(AppState {
        device_service,
        telemetry_service,
    });

    // Build router (presentation layer)
    // Bodies are compressed by the handlers, so no CompressionLayer here.
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/devices", get(list_devices))
        .route("/devices/:id/telemetry", get(get_telemetry))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = config.server.listen_addr.parse()?;
    tracing::info!(
        "Starting vehicle-telemetry service on {} (measurement {}, timeout {}s)",
        addr,
        config.query.measurement,
        config.query.timeout_secs
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

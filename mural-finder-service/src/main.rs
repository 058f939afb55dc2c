use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::info;

mod annotate;
mod api;
mod config;
mod db;
mod error;
mod geometry;
mod matching;
mod query;
mod service;

use crate::config::ServiceConfig;
use crate::service::MuralFinderService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!(
        "Starting mural finder service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = Arc::new(ServiceConfig::load()?);
    info!(
        host = %config.server.host,
        port = config.server.port,
        database = %config.storage.database_path.display(),
        image_dir = %config.storage.image_dir.display(),
        "Configuration loaded"
    );

    if !config.storage.image_dir.is_dir() {
        tracing::warn!(
            path = %config.storage.image_dir.display(),
            "Image directory does not exist, every match will be reported without an image"
        );
    }

    let metrics = PrometheusBuilder::new().install_recorder()?;

    let service = Arc::new(MuralFinderService::new(config.clone())?);
    let app = api::router(service, metrics);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mural_finder_service=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}

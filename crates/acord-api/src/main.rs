//! # acord-api: Binary Entry Point
//!
//! Reads configuration from the environment, loads the schema registry,
//! starts the delivery worker and serves the gateway until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use acord_api::delivery::{run_delivery_worker, QueueSink};
use acord_api::state::{AppConfig, AppState, LogFormat};
use acord_core::SystemClock;
use acord_schema::SchemaRegistry;
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    let registry = match &config.schema_file {
        Some(path) => SchemaRegistry::from_path(path)
            .with_context(|| format!("loading schema registry from {}", path.display()))?,
        None => SchemaRegistry::standard().context("loading built-in schema registry")?,
    };
    tracing::info!(
        forms = registry.len(),
        source = %config
            .schema_file
            .as_ref()
            .map_or_else(|| "built-in".to_string(), |p| p.display().to_string()),
        "schema registry loaded"
    );

    let (sink, receiver) = QueueSink::channel(config.delivery_capacity);
    tokio::spawn(run_delivery_worker(receiver));

    let mut state = AppState::new(
        config.clone(),
        registry,
        Arc::new(SystemClock),
        Arc::new(sink),
    );
    if config.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing Prometheus recorder")?;
        let upkeep = handle.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
            loop {
                interval.tick().await;
                upkeep.run_upkeep();
            }
        });
        state = state.with_metrics(handle);
    }

    let app = acord_api::app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("ACORD gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("ACORD gateway stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

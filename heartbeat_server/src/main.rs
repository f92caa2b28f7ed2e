//! Main entry point for the heartbeat demo server binary

use anyhow::Result;
use heartbeat_core::{create_app, run_server, AppConfig, AppState, SpanRecorder, TracingSpanRecorder};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());
    info!("Database URL: {}", config.database.url);
    info!(
        service.name = %config.telemetry.service_name,
        service.version = %config.telemetry.service_version,
        deployment.environment = %config.telemetry.environment,
        "Service resource"
    );
    info!("OTLP Exporter Endpoint: {}", config.otlp_traces_endpoint());

    let addr: SocketAddr = config.bind_address().parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

    let recorder: Arc<dyn SpanRecorder> = Arc::new(TracingSpanRecorder::new());
    let state = AppState::bootstrap(&config, recorder)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize heartbeat store: {}", e))?;

    info!("App: {} v{}", state.app_name, state.version);

    let app = create_app(state, &config);

    run_server(app, addr).await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            let default_level = if cfg!(debug_assertions) {
                "debug"
            } else {
                "info"
            };

            format!(
                "{}={},heartbeat_core={},tower_http=debug,sqlx=warn",
                env!("CARGO_CRATE_NAME").replace('-', "_"),
                default_level,
                default_level
            ).into()
        });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.pretty())
            .init();
    }
}

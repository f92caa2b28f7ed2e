//! Core library for the heartbeat demo service: heartbeat persistence, health
//! evaluation, simulated item lookups and the HTTP routes exposing them.

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod health;
pub mod heartbeat;
pub mod middleware;
pub mod simulation;
pub mod telemetry;

pub use config::AppConfig;
pub use database::{get_database_pool, DatabaseManager};
pub use error::{AppError, Result};
pub use handlers::create_routes;
pub use health::{HealthEvaluator, HealthReport, LivenessCheck};
pub use heartbeat::{HeartbeatRecord, HeartbeatStatus, HeartbeatStore, SqliteHeartbeatStore};
pub use simulation::{ItemLookup, UpstreamProbe};
pub use telemetry::{InMemorySpanRecorder, ServiceResource, SpanRecorder, TracingSpanRecorder};

use axum::Router;
use config::LivenessKind;
use health::{DatabaseLivenessCheck, UpstreamLivenessCheck};
use simulation::{CatalogSimulator, InventorySimulator, PricingSimulator};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub resource: ServiceResource,
    pub store: Arc<dyn HeartbeatStore>,
    pub evaluator: Arc<HealthEvaluator>,
    pub item_lookup: ItemLookup,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        recorder: Arc<dyn SpanRecorder>,
        store: Arc<dyn HeartbeatStore>,
        liveness: Arc<dyn LivenessCheck>,
    ) -> Self {
        let evaluator = HealthEvaluator::new(store.clone(), liveness, recorder.clone());
        let item_lookup = ItemLookup::new(&config.simulation, recorder);

        Self {
            app_name: config.telemetry.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            resource: ServiceResource::from_config(config),
            store,
            evaluator: Arc::new(evaluator),
            item_lookup,
        }
    }

    /// Opens the database, prepares the heartbeat store and wires the
    /// configured liveness check.
    pub async fn bootstrap(config: &AppConfig, recorder: Arc<dyn SpanRecorder>) -> Result<Self> {
        let pool = get_database_pool(&config.database).await?;
        let db_manager = DatabaseManager::new(pool.clone());

        let store = SqliteHeartbeatStore::with_config(pool, recorder.clone(), &config.heartbeat);
        store.initialize().await?;
        let store: Arc<dyn HeartbeatStore> = Arc::new(store);

        let liveness: Arc<dyn LivenessCheck> = match config.heartbeat.liveness_check {
            LivenessKind::Database => Arc::new(DatabaseLivenessCheck::new(db_manager)),
            LivenessKind::Upstreams => {
                let simulation = &config.simulation;
                let probes: Vec<Arc<dyn UpstreamProbe>> = vec![
                    Arc::new(CatalogSimulator::new(simulation.clone(), recorder.clone())),
                    Arc::new(InventorySimulator::new(simulation.clone(), recorder.clone())),
                    Arc::new(PricingSimulator::new(simulation.clone(), recorder.clone())),
                ];
                Arc::new(UpstreamLivenessCheck::new(probes))
            }
        };

        info!(
            "Liveness check: {:?}, heartbeat retention: {}h",
            config.heartbeat.liveness_check, config.heartbeat.retention_hours
        );

        Ok(Self::new(config, recorder, store, liveness))
    }
}

pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    let router = Router::new()
        .merge(create_routes())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_seconds,
        )));

    middleware::with_request_logging(router, state.resource.clone()).with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

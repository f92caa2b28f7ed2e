//! Health check handler

use axum::{extract::State, Json};
use tracing::info;

use crate::{error::Result, health::HealthReport, AppState};

pub async fn handle_health(State(state): State<AppState>) -> Result<Json<HealthReport>> {
    info!("GET /health - Evaluating service health");

    let report = state.evaluator.evaluate().await?;
    Ok(Json(report))
}

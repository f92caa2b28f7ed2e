//! Demo endpoints that exist to produce nested spans

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::{error::Result, simulation::ItemDetails, AppState};

pub async fn handle_root() -> impl IntoResponse {
    Json(json!({ "Hello": "World" }))
}

pub async fn handle_get_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<ItemDetails>> {
    info!("GET /items/{} - Looking up item", item_id);

    let details = state.item_lookup.lookup(item_id).await?;
    Ok(Json(details))
}

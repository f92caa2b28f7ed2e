use axum::{routing::get, Router};

use crate::handlers::{health::handle_health, items::handle_get_item, items::handle_root};
use crate::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/items/:item_id", get(handle_get_item))
}

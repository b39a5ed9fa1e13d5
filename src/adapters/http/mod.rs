pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use tower_http::trace::TraceLayer;
use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/api/analyze", post(routes::analyze))
        .route("/api/status", get(routes::status))
        .route("/api/advisory", get(routes::advisory))
        .route("/api/config", get(routes::get_config))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

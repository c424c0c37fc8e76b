pub mod auth;
pub mod http;
pub mod hue_provider;
pub mod state;
pub mod ws_worker;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use state::AppState;

/// Assemble the hub's router: dashboard, health, the Hue HTTP surface, and
/// the worker websocket uplink, all sharing one `Arc<AppState>`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(http::hue::dashboard_root))
        .route("/healthz", get(http::health::healthz))
        .route("/readyz", get(http::health::readyz))
        .route("/metrics", get(http::metrics::metrics))
        .route("/ws", get(ws_worker::ws_worker_handler))
        .route("/hue/state", get(http::hue::get_state))
        .route("/hue/schedules", post(http::hue::post_schedules))
        .route("/hue/schedules/:id/:status", get(http::hue::toggle_schedule))
        .with_state(state)
}

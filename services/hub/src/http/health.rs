//! Liveness/readiness, same shape as the teacher's own `health` module:
//! `healthz` never depends on external state, `readyz` reflects whether a
//! worker bus is currently attached.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.has_bus().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

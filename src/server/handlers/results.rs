//! Read-only poll snapshot for the overlay and voting pages.

use crate::polls::PollSnapshot;
use crate::server::AppState;
use axum::extract::State;
use axum::Json;

/// `GET /api/poll`
pub async fn get_poll(State(state): State<AppState>) -> Json<PollSnapshot> {
    Json(state.engine.snapshot())
}

//! Operator endpoints: start, stop and reset the poll.
//!
//! There is no authentication; anyone who can reach the dashboard listener
//! controls the poll.

use super::SuccessResponse;
use crate::server::error::ApiError;
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartPollRequest {
    pub question: String,
    pub options: Vec<String>,
}

/// `POST /api/start`
pub async fn start_poll(
    State(state): State<AppState>,
    payload: Result<Json<StartPollRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(request) = payload?;
    state.engine.start_poll(&request.question, &request.options)?;
    Ok(SuccessResponse::ok())
}

/// `POST /api/stop`
pub async fn stop_poll(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.engine.stop_poll();
    SuccessResponse::ok()
}

/// `POST /api/reset`
pub async fn reset_poll(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.engine.reset_poll();
    SuccessResponse::ok()
}

//! Public voting endpoints.

use crate::server::connect_info::VoterId;
use crate::server::error::ApiError;
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/vote`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub option: String,
}

/// Accepted vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    pub success: bool,
    /// Seconds before the same voter may vote again
    pub cooldown: u64,
}

/// Body of `GET /api/cooldown`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownResponse {
    pub on_cooldown: bool,
    pub remaining: u64,
}

/// `POST /api/vote`
pub async fn cast_vote(
    State(state): State<AppState>,
    voter: VoterId,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteResponse>, ApiError> {
    let Json(request) = payload?;
    let receipt = state.engine.cast_vote(voter.as_str(), &request.option)?;
    Ok(Json(VoteResponse {
        success: true,
        cooldown: receipt.cooldown_secs,
    }))
}

/// `GET /api/cooldown`
pub async fn check_cooldown(State(state): State<AppState>, voter: VoterId) -> Json<CooldownResponse> {
    let status = state.engine.cooldown_status(voter.as_str());
    Json(CooldownResponse {
        on_cooldown: status.on_cooldown,
        remaining: status.remaining_secs,
    })
}

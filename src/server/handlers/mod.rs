//! HTTP handlers for the three listeners.

pub mod control;
pub mod results;
pub mod vote;

use super::Listener;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Plain success acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub listener: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler(listener: Listener) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        listener: listener.name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

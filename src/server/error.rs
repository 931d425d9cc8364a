//! API error responses
//!
//! Every failure is answered with `{success: false, message, cooldown?}`.

use crate::polls::PollError;
use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureResponse {
    pub success: bool,
    pub message: String,
    /// Seconds until the voter may retry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<u64>,
}

/// Errors returned by the HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Poll(PollError::NoActivePoll) => StatusCode::CONFLICT,
            ApiError::Poll(PollError::OnCooldown { .. }) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Poll(PollError::InvalidOption(_))
            | ApiError::Poll(PollError::NotEnoughOptions { .. })
            | ApiError::Poll(PollError::DuplicateOption(_))
            | ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::Poll(err) => err.retry_after(),
            ApiError::MalformedRequest(_) => None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let cooldown = self.retry_after();

        if status.is_client_error() {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = FailureResponse {
            success: false,
            message: self.to_string(),
            cooldown,
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = cooldown {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

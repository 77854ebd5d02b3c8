//! Webhook failure kinds and their HTTP mapping.
//!
//! Bodies never carry remote or internal detail; that goes to the log only.

use crate::channels::DeliveryError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Duration;

/// Body of a throttled webhook request.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Payload failed shape validation; no reply was attempted.
    #[error("invalid request data: {0}")]
    MalformedRequest(&'static str),
    /// The reply call failed (transport error or non-2xx).
    #[error("failed to send message to LINE API: {0}")]
    DeliveryFailed(#[from] DeliveryError),
    /// Client exceeded its request budget for the current window.
    #[error("rate limited, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            WebhookError::DeliveryFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebhookError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            WebhookError::RateLimited { retry_after } => {
                let secs = retry_after.as_secs().max(1);
                let mut response = (StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE).into_response();
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            other => other.status().into_response(),
        }
    }
}

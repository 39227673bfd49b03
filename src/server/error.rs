//! Webhook error responses

use crate::pipeline::RelayError;
use crate::server::signature::SignatureError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Why a webhook delivery was refused
///
/// GitHub only shows the status and body, so responses are plain text.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid payload")]
    InvalidPayload(#[from] SignatureError),

    #[error("invalid event")]
    InvalidEvent(#[from] serde_json::Error),

    #[error("failed to record trigger")]
    TriggerRecord(#[from] RelayError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::InvalidPayload(e) => {
                tracing::warn!("Rejected webhook: {}", e);
                StatusCode::BAD_REQUEST
            }
            WebhookError::InvalidEvent(e) => {
                tracing::warn!("Failed to parse webhook: {}", e);
                StatusCode::BAD_REQUEST
            }
            WebhookError::TriggerRecord(e) => {
                tracing::error!("{}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

pub type WebhookResult<T> = Result<T, WebhookError>;

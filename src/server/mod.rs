//! HTTP surface of the relay

pub mod error;
pub mod signature;
pub mod webhook;

use crate::execution::CommandExecutor;
use crate::pipeline::Relay;
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const WEBHOOK_PATH: &str = "/tool/github-sentry/webhook";
pub const HEALTH_PATH: &str = "/tool/github-sentry/health";

/// Shared state for the webhook handler
pub struct AppState<E> {
    pub relay: Arc<Relay<E>>,
    pub webhook_secret: Arc<str>,
    pub staging_branch: Arc<str>,
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            relay: Arc::clone(&self.relay),
            webhook_secret: Arc::clone(&self.webhook_secret),
            staging_branch: Arc::clone(&self.staging_branch),
        }
    }
}

impl<E> AppState<E> {
    pub fn new(relay: Arc<Relay<E>>, webhook_secret: &str, staging_branch: &str) -> Self {
        Self {
            relay,
            webhook_secret: Arc::from(webhook_secret),
            staging_branch: Arc::from(staging_branch),
        }
    }
}

/// GET /tool/github-sentry/health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Create the router with all endpoints
pub fn create_router<E: CommandExecutor + 'static>(state: AppState<E>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(webhook::handle_webhook::<E>))
        .route(HEALTH_PATH, get(health_check))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

//! Push webhook handler (the trigger gate)

use crate::core::{GateDecision, PushEvent};
use crate::execution::CommandExecutor;
use crate::server::error::WebhookResult;
use crate::server::signature::{verify_signature, SIGNATURE_HEADER};
use crate::server::AppState;
use axum::{body::Bytes, extract::State, http::HeaderMap};
use tracing::{debug, info};

pub const EVENT_HEADER: &str = "x-github-event";

/// POST /tool/github-sentry/webhook
pub async fn handle_webhook<E: CommandExecutor + 'static>(
    State(state): State<AppState<E>>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResult<&'static str> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    verify_signature(&state.webhook_secret, &body, signature)?;

    let event_type = headers
        .get(EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    // Unknown and missing event types are ignored like any other non-push event
    if event_type != "push" {
        debug!("Ignoring {:?} event", event_type);
        return Ok("event ignored");
    }

    let event = PushEvent::from_json(&body)?;

    let trigger = match event.gate(&state.staging_branch) {
        GateDecision::Accept(trigger) => trigger,
        GateDecision::BranchIgnored { branch } => {
            debug!("Ignoring push to {}", branch);
            return Ok("branch ignored");
        }
        GateDecision::NoHeadCommit => {
            info!("Push to {} has no head commit", state.staging_branch);
            return Ok("no head commit");
        }
    };

    let handle = state.relay.accept(trigger).await?;
    debug!(trigger_id = handle.trigger_id, "Run dispatched");

    Ok("webhook received")
}

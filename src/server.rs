//! HTTP request URLs for Slack: slash commands and interactivity.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::approval::{Ack, ApprovalWorkflow};
use crate::error::SignatureError;
use crate::slack::payload::{InteractionPayload, SlashCommand};
use crate::slack::signature::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<ApprovalWorkflow>,
    pub signing_secret: Arc<SecretString>,
}

/// Build the Axum router with the Slack request URLs.
pub fn slack_routes(workflow: Arc<ApprovalWorkflow>, signing_secret: SecretString) -> Router {
    let state = AppState {
        workflow,
        signing_secret: Arc::new(signing_secret),
    };

    Router::new()
        .route("/health", get(health))
        .route("/slack/commands", post(slash_command))
        .route("/slack/interactions", post(interaction))
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "slack-approvals"
    }))
}

// ── Slack endpoints ─────────────────────────────────────────────────────

async fn slash_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Err(e) = verify_request(&state, &headers, &body) {
        warn!(error = %e, "Rejecting unsigned slash command");
        return StatusCode::UNAUTHORIZED;
    }

    let command = match SlashCommand::from_form(&body) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "Unreadable slash command");
            return StatusCode::BAD_REQUEST;
        }
    };

    let (ack, acked) = Ack::oneshot();
    let workflow = Arc::clone(&state.workflow);
    tokio::spawn(async move { workflow.handle_command(ack, command).await });

    // The handler acks before its first Slack call; the response is the ack.
    if acked.await.is_err() {
        debug!("Slash command handler finished without acking");
    }
    StatusCode::OK
}

async fn interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Err(e) = verify_request(&state, &headers, &body) {
        warn!(error = %e, "Rejecting unsigned interaction");
        return StatusCode::UNAUTHORIZED;
    }

    let payload = match InteractionPayload::from_form(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Unreadable interaction payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let (ack, acked) = Ack::oneshot();
    let workflow = Arc::clone(&state.workflow);
    tokio::spawn(async move { workflow.handle_interaction(ack, payload).await });

    if acked.await.is_err() {
        debug!("Interaction handler finished without acking");
    }
    StatusCode::OK
}

fn verify_request(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), SignatureError> {
    let header = |name: &'static str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or(SignatureError::MissingHeader(name))
    };

    let timestamp = header(TIMESTAMP_HEADER)?;
    let sig = header(SIGNATURE_HEADER)?;

    signature::verify(
        state.signing_secret.expose_secret(),
        timestamp,
        body,
        sig,
        chrono::Utc::now().timestamp(),
    )
}

//! Socket mode: receives Slack events over a WebSocket instead of HTTP.
//!
//! Each envelope is acknowledged by writing its `envelope_id` back on the
//! socket. The connection is reopened whenever Slack asks or it drops.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use secrecy::SecretString;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::approval::{Ack, ApprovalWorkflow};
use crate::error::SlackError;
use crate::slack::SlackClient;
use crate::slack::payload::{InteractionPayload, SlashCommand};

/// Pause before reconnecting after a failure.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// One socket mode frame.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    payload: Option<serde_json::Value>,
    #[serde(default)]
    reason: Option<String>,
}

/// What the read loop should do after a frame.
#[derive(Debug, PartialEq, Eq)]
enum Next {
    Continue,
    Reconnect,
}

/// Run socket mode until the process is stopped.
pub async fn run(client: Arc<SlackClient>, app_token: SecretString, workflow: Arc<ApprovalWorkflow>) {
    loop {
        match run_connection(&client, &app_token, &workflow).await {
            Ok(()) => info!("Socket mode connection closed, reconnecting"),
            Err(e) => {
                warn!(error = %e, "Socket mode connection failed");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

async fn run_connection(
    client: &SlackClient,
    app_token: &SecretString,
    workflow: &Arc<ApprovalWorkflow>,
) -> Result<(), SlackError> {
    let url = client.open_connection(app_token).await?;
    let (ws, _resp) = connect_async(url.as_str())
        .await
        .map_err(|e| SlackError::Socket(e.to_string()))?;
    let (mut sink, mut stream) = ws.split();

    // Acks come from spawned handler tasks, so writes go through one writer task.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                debug!("Socket closed while writing");
                break;
            }
        }
    });

    info!("Socket mode connected");

    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|e| SlackError::Socket(e.to_string()))?;
        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        if handle_frame(text.as_str(), workflow, &out_tx) == Next::Reconnect {
            break;
        }
    }

    writer.abort();
    Ok(())
}

fn handle_frame(
    text: &str,
    workflow: &Arc<ApprovalWorkflow>,
    out_tx: &mpsc::UnboundedSender<String>,
) -> Next {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!(error = %e, "Unrecognized socket mode frame");
            return Next::Continue;
        }
    };

    match envelope.kind.as_str() {
        "hello" => {
            debug!("Socket mode hello");
            Next::Continue
        }
        "disconnect" => {
            info!(reason = ?envelope.reason, "Slack requested reconnect");
            Next::Reconnect
        }
        "slash_commands" => {
            let mut ack = envelope_ack(envelope.envelope_id.as_deref(), out_tx);
            let command = envelope
                .payload
                .ok_or_else(|| "missing payload".to_string())
                .and_then(|p| serde_json::from_value::<SlashCommand>(p).map_err(|e| e.to_string()));
            match command {
                Ok(command) => {
                    let workflow = Arc::clone(workflow);
                    tokio::spawn(async move { workflow.handle_command(ack, command).await });
                }
                Err(e) => {
                    ack.ack();
                    warn!(error = %e, "Unreadable slash command envelope");
                }
            }
            Next::Continue
        }
        "interactive" => {
            let mut ack = envelope_ack(envelope.envelope_id.as_deref(), out_tx);
            let payload = envelope
                .payload
                .map(InteractionPayload::from_value)
                .unwrap_or_else(|| Ok(InteractionPayload::Unsupported));
            match payload {
                Ok(payload) => {
                    let workflow = Arc::clone(workflow);
                    tokio::spawn(async move { workflow.handle_interaction(ack, payload).await });
                }
                Err(e) => {
                    ack.ack();
                    warn!(error = %e, "Unreadable interaction envelope");
                }
            }
            Next::Continue
        }
        other => {
            envelope_ack(envelope.envelope_id.as_deref(), out_tx).ack();
            debug!(kind = other, "Ignoring socket mode envelope");
            Next::Continue
        }
    }
}

/// An ack that writes `{"envelope_id": ...}` back to Slack.
fn envelope_ack(envelope_id: Option<&str>, out_tx: &mpsc::UnboundedSender<String>) -> Ack {
    let Some(id) = envelope_id else {
        return Ack::noop();
    };
    let frame = serde_json::json!({ "envelope_id": id }).to_string();
    let out_tx = out_tx.clone();
    Ack::new(move || {
        let _ = out_tx.send(frame);
    })
}

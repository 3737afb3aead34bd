//! Outbound notifications for the approval flow.
//!
//! Every send is independent: a failure is logged and never undoes or blocks
//! the others.

use std::sync::Arc;

use tracing::{info, warn};

use super::token::RequestState;
use super::{ApprovalRequest, Decision, Outcome};
use crate::error::ApprovalError;
use crate::slack::SlackApi;
use crate::slack::types::{Block, Element, MessageContent, MessageRef, Text};

pub const APPROVAL_ACTION_BLOCK: &str = "approval_action";

/// What `deliver_outcome` managed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub requester_notified: bool,
    pub notification_finalized: bool,
}

pub struct Notifier {
    slack: Arc<dyn SlackApi>,
}

impl Notifier {
    pub fn new(slack: Arc<dyn SlackApi>) -> Self {
        Self { slack }
    }

    /// DM the approver the request with Approve/Reject buttons.
    pub async fn send_approver_notification(
        &self,
        request: &ApprovalRequest,
    ) -> Result<MessageRef, ApprovalError> {
        let content = approver_notification(request)?;
        let message = self
            .slack
            .post_message(&request.approver_id, &content)
            .await
            .map_err(|source| ApprovalError::DeliveryFailure {
                step: "approver notification",
                source,
            })?;

        info!(
            requester = %request.requester_id,
            approver = %request.approver_id,
            notification = %message,
            "Approval request sent"
        );
        Ok(message)
    }

    /// Tell the requester the outcome, then finalize the originating notification.
    pub async fn deliver_outcome(&self, state: &RequestState, decision: &Decision) -> DeliveryReport {
        let requester_notified = match self.notify_requester(state, decision).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    requester = %state.requester_id,
                    outcome = %decision.outcome,
                    error = %e,
                    "Failed to notify requester"
                );
                false
            }
        };

        let notification_finalized = match self.finalize_notification(state, decision).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    notification = %decision.message,
                    outcome = %decision.outcome,
                    error = %e,
                    "Failed to finalize approval notification"
                );
                false
            }
        };

        info!(
            requester = %state.requester_id,
            actor = %decision.actor_id,
            outcome = %decision.outcome,
            requester_notified,
            notification_finalized,
            "Approval decision delivered"
        );

        DeliveryReport {
            requester_notified,
            notification_finalized,
        }
    }

    async fn notify_requester(
        &self,
        state: &RequestState,
        decision: &Decision,
    ) -> Result<(), ApprovalError> {
        let content = MessageContent::text(requester_outcome_text(decision.outcome, &decision.actor_id));
        self.slack
            .post_message(&state.requester_id, &content)
            .await
            .map(|_| ())
            .map_err(|source| ApprovalError::DeliveryFailure {
                step: "requester notification",
                source,
            })
    }

    async fn finalize_notification(
        &self,
        state: &RequestState,
        decision: &Decision,
    ) -> Result<(), ApprovalError> {
        let content = finalized_notification(&state.requester_id, decision.outcome);
        self.slack
            .update_message(&decision.message, &content)
            .await
            .map_err(|source| ApprovalError::DeliveryFailure {
                step: "notification update",
                source,
            })
    }
}

// ── Message builders ────────────────────────────────────────────────────

/// The approver's message: request text plus one button per outcome, each
/// carrying the same token.
pub fn approver_notification(request: &ApprovalRequest) -> Result<MessageContent, ApprovalError> {
    let token = request.token();
    token.check_fits_button()?;

    let buttons = Outcome::ALL
        .into_iter()
        .map(|outcome| Element::Button {
            action_id: outcome.action_id().into(),
            text: Text::plain(outcome.button_label()),
            value: token.as_str().to_string(),
            style: Some(outcome.button_style()),
        })
        .collect();

    Ok(
        MessageContent::text(format!("Approval request from <@{}>", request.requester_id))
            .with_blocks(vec![
                Block::Section {
                    text: Text::mrkdwn(format!("*Approval Request*\n{}", request.body)),
                },
                Block::Actions {
                    block_id: APPROVAL_ACTION_BLOCK.into(),
                    elements: buttons,
                },
            ]),
    )
}

/// DM text for the requester.
pub fn requester_outcome_text(outcome: Outcome, actor_id: &str) -> String {
    format!("Your approval request has been *{outcome}* by <@{actor_id}>.")
}

/// Terminal state of the originating notification: status line, no blocks.
pub fn finalized_notification(requester_id: &str, outcome: Outcome) -> MessageContent {
    MessageContent::text(format!(
        "Approval request from <@{requester_id}> has been {outcome}."
    ))
    .with_blocks(Vec::new())
}

//! Top-level event handlers.
//!
//! Each handler acks first, then runs best-effort: every failure ends up in the
//! log and nothing propagates to the caller.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::composer::{APPROVAL_MODAL_CALLBACK, approval_modal, approver_options};
use super::dispatcher::{DecisionDispatcher, DecisionEvent};
use super::guard::DecisionGuard;
use super::notifier::Notifier;
use super::{Ack, ApprovalRequest};
use crate::error::ApprovalError;
use crate::slack::SlackApi;
use crate::slack::payload::{InteractionPayload, SlashCommand, SubmittedView};

/// The approval bot: composer, notifier and dispatcher over one Slack adapter.
pub struct ApprovalWorkflow {
    slack: Arc<dyn SlackApi>,
    command: String,
    dispatcher: DecisionDispatcher,
}

impl ApprovalWorkflow {
    pub fn new(slack: Arc<dyn SlackApi>, command: impl Into<String>) -> Self {
        let notifier = Notifier::new(Arc::clone(&slack));
        Self {
            slack,
            command: command.into(),
            dispatcher: DecisionDispatcher::new(notifier, None),
        }
    }

    /// Drop repeated decisions on the same message for `guard`'s TTL.
    pub fn with_decision_guard(mut self, guard: DecisionGuard) -> Self {
        let notifier = Notifier::new(Arc::clone(&self.slack));
        self.dispatcher = DecisionDispatcher::new(notifier, Some(guard));
        self
    }

    /// Slash command: open the approver-selection modal.
    pub async fn handle_command(&self, mut ack: Ack, command: SlashCommand) {
        ack.ack();

        if command.command != self.command {
            debug!(command = %command.command, "Ignoring unknown slash command");
            return;
        }

        let users = match self.slack.list_users().await {
            Ok(users) => users,
            Err(e) => {
                let e = ApprovalError::DirectoryUnavailable(e);
                warn!(requester = %command.user_id, error = %e, "Offering an empty approver list");
                Vec::new()
            }
        };

        let options = approver_options(&command.user_id, &users);
        if options.is_empty() {
            warn!(requester = %command.user_id, "No eligible approvers in directory");
        }

        let view = approval_modal(options);
        if let Err(e) = self.slack.open_view(&command.trigger_id, &view).await {
            let e = ApprovalError::DeliveryFailure {
                step: "approval modal",
                source: e,
            };
            error!(requester = %command.user_id, error = %e, "Failed to open approval modal");
        }
    }

    /// Modal submission: DM the chosen approver.
    pub async fn handle_submission(&self, mut ack: Ack, requester_id: &str, view: &SubmittedView) {
        ack.ack();

        let request = match ApprovalRequest::from_submission(requester_id, view) {
            Ok(request) => request,
            Err(e) => {
                warn!(requester = %requester_id, error = %e, "Rejecting approval submission");
                return;
            }
        };

        if let Err(e) = self.dispatcher.notifier().send_approver_notification(&request).await {
            error!(
                requester = %request.requester_id,
                approver = %request.approver_id,
                error = %e,
                "Failed to send approval request"
            );
        }
    }

    /// Route an interaction to the submission or decision handler.
    pub async fn handle_interaction(&self, mut ack: Ack, payload: InteractionPayload) {
        match payload {
            InteractionPayload::ViewSubmission { user, view } => {
                if view.callback_id == APPROVAL_MODAL_CALLBACK {
                    self.handle_submission(ack, &user.id, &view).await;
                } else {
                    ack.ack();
                    debug!(callback_id = %view.callback_id, "Ignoring unknown view submission");
                }
            }
            InteractionPayload::BlockActions {
                user,
                channel,
                message,
                container,
                actions,
            } => {
                let Some(action) = actions.first() else {
                    ack.ack();
                    debug!("Ignoring block_actions without actions");
                    return;
                };

                match DecisionEvent::from_block_actions(
                    &user.id,
                    channel.as_ref(),
                    message.as_ref(),
                    container.as_ref(),
                    action,
                ) {
                    Ok(Some(event)) => {
                        let result = self.dispatcher.dispatch(ack, event).await;
                        debug!(?result, "Decision dispatched");
                    }
                    Ok(None) => {
                        ack.ack();
                        debug!(action_id = %action.action_id, "Ignoring non-decision action");
                    }
                    Err(e) => {
                        ack.ack();
                        warn!(actor = %user.id, error = %e, "Dropping decision event");
                    }
                }
            }
            InteractionPayload::Unsupported => {
                ack.ack();
                debug!("Ignoring unsupported interaction");
            }
        }
    }
}

impl std::fmt::Debug for ApprovalWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalWorkflow")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

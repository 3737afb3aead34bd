//! Approval request lifecycle.
//!
//! compose modal → submit → approver notification (token on the buttons)
//! → decision click → requester notified, approver message finalized.

pub mod composer;
pub mod dispatcher;
pub mod guard;
pub mod notifier;
pub mod token;
pub mod workflow;

use tokio::sync::oneshot;

use crate::error::ApprovalError;
use crate::slack::payload::SubmittedView;
use crate::slack::types::{ButtonStyle, MessageRef};

pub use dispatcher::{DecisionDispatcher, DecisionEvent, DispatchResult};
pub use guard::DecisionGuard;
pub use notifier::{DeliveryReport, Notifier};
pub use token::{RequestState, Token};
pub use workflow::ApprovalWorkflow;

/// A submitted request. Lives only until its token is on the approver's buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub requester_id: String,
    pub approver_id: String,
    pub body: String,
}

impl ApprovalRequest {
    /// Read the approver and request text out of a submitted approval modal.
    pub fn from_submission(
        requester_id: &str,
        view: &SubmittedView,
    ) -> Result<Self, ApprovalError> {
        let approver_id =
            view.selected_value(composer::APPROVER_BLOCK, composer::APPROVER_ACTION)?;
        let body = view.text_value(composer::APPROVAL_TEXT_BLOCK, composer::APPROVAL_TEXT_ACTION)?;

        if requester_id.is_empty() || approver_id.is_empty() {
            return Err(ApprovalError::InvalidPayload(
                "submission without requester or approver".into(),
            ));
        }

        Ok(Self {
            requester_id: requester_id.to_string(),
            approver_id: approver_id.to_string(),
            body: body.to_string(),
        })
    }

    pub fn token(&self) -> Token {
        token::encode(&self.requester_id, &self.body)
    }
}

/// The approver's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Approved,
    Rejected,
}

impl Outcome {
    pub const ALL: [Outcome; 2] = [Outcome::Approved, Outcome::Rejected];

    /// Map a button `action_id` to an outcome.
    pub fn from_action_id(action_id: &str) -> Option<Self> {
        match action_id {
            "approve_button" => Some(Self::Approved),
            "reject_button" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn action_id(self) -> &'static str {
        match self {
            Self::Approved => "approve_button",
            Self::Rejected => "reject_button",
        }
    }

    /// The word used in every outcome message.
    pub fn word(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            Self::Approved => "Approve",
            Self::Rejected => "Reject",
        }
    }

    pub fn button_style(self) -> ButtonStyle {
        match self {
            Self::Approved => ButtonStyle::Primary,
            Self::Rejected => ButtonStyle::Danger,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.word())
    }
}

/// A decision on one originating notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub outcome: Outcome,
    pub actor_id: String,
    pub message: MessageRef,
}

/// Acknowledgment hook for one inbound Slack event.
///
/// Slack drops interactions that are not acknowledged within three seconds,
/// so handlers fire this before any other work. Firing twice is a no-op.
pub struct Ack {
    on_ack: Option<Box<dyn FnOnce() + Send>>,
}

impl Ack {
    pub fn new(on_ack: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_ack: Some(Box::new(on_ack)),
        }
    }

    /// An ack that resolves the returned receiver.
    pub fn oneshot() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let ack = Self::new(move || {
            let _ = tx.send(());
        });
        (ack, rx)
    }

    /// An ack with nothing attached.
    pub fn noop() -> Self {
        Self { on_ack: None }
    }

    pub fn ack(&mut self) {
        if let Some(on_ack) = self.on_ack.take() {
            on_ack();
        }
    }
}

impl std::fmt::Debug for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ack")
            .field("pending", &self.on_ack.is_some())
            .finish()
    }
}

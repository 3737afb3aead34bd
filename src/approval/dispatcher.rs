//! Decision dispatch: button click → outcome delivery.

use tracing::{debug, info, warn};

use super::guard::DecisionGuard;
use super::notifier::{DeliveryReport, Notifier};
use super::{Ack, Decision, Outcome, token};
use crate::error::ApprovalError;
use crate::slack::payload::{PayloadAction, PayloadChannel, PayloadContainer, PayloadMessage};
use crate::slack::types::MessageRef;

/// A decision click as received from Slack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionEvent {
    pub actor_id: String,
    pub token: String,
    pub message: MessageRef,
    pub outcome: Outcome,
}

impl DecisionEvent {
    /// Build from a `block_actions` payload.
    ///
    /// Returns `Ok(None)` when the action is not a decision button.
    pub fn from_block_actions(
        actor_id: &str,
        channel: Option<&PayloadChannel>,
        message: Option<&PayloadMessage>,
        container: Option<&PayloadContainer>,
        action: &PayloadAction,
    ) -> Result<Option<Self>, ApprovalError> {
        let Some(outcome) = Outcome::from_action_id(&action.action_id) else {
            return Ok(None);
        };

        let channel_id = channel
            .map(|c| c.id.clone())
            .or_else(|| container.and_then(|c| c.channel_id.clone()))
            .ok_or_else(|| ApprovalError::InvalidPayload("decision without channel".into()))?;
        let ts = message
            .map(|m| m.ts.clone())
            .or_else(|| container.and_then(|c| c.message_ts.clone()))
            .ok_or_else(|| ApprovalError::InvalidPayload("decision without message ts".into()))?;
        let token = action
            .value
            .clone()
            .ok_or_else(|| ApprovalError::MalformedToken("button carries no value".into()))?;

        Ok(Some(Self {
            actor_id: actor_id.to_string(),
            token,
            message: MessageRef::new(channel_id, ts),
            outcome,
        }))
    }
}

/// How a dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Delivered(DeliveryReport),
    /// The token did not decode; nothing was sent.
    MalformedToken,
    /// The guard saw an earlier decision for this message.
    Duplicate,
}

pub struct DecisionDispatcher {
    notifier: Notifier,
    guard: Option<DecisionGuard>,
}

impl DecisionDispatcher {
    pub fn new(notifier: Notifier, guard: Option<DecisionGuard>) -> Self {
        Self { notifier, guard }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Ack, decode, deliver. Both outcomes take the same path.
    pub async fn dispatch(&self, mut ack: Ack, event: DecisionEvent) -> DispatchResult {
        ack.ack();

        let state = match token::decode(&event.token) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    actor = %event.actor_id,
                    notification = %event.message,
                    error = %e,
                    "Dropping decision with malformed token"
                );
                return DispatchResult::MalformedToken;
            }
        };

        if let Some(guard) = &self.guard
            && !guard.try_claim(&event.message).await
        {
            info!(
                actor = %event.actor_id,
                notification = %event.message,
                outcome = %event.outcome,
                "Ignoring duplicate decision"
            );
            return DispatchResult::Duplicate;
        }

        debug!(
            requester = %state.requester_id,
            actor = %event.actor_id,
            outcome = %event.outcome,
            "Dispatching decision"
        );

        let decision = Decision {
            outcome: event.outcome,
            actor_id: event.actor_id,
            message: event.message,
        };
        let report = self.notifier.deliver_outcome(&state, &decision).await;

        // Nothing reached Slack, so let the approver retry.
        if let Some(guard) = &self.guard
            && !report.requester_notified
            && !report.notification_finalized
        {
            guard.release(&decision.message).await;
        }

        DispatchResult::Delivered(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::slack::testing::{Call, FakeSlack};

    fn event(outcome: Outcome, token: &str) -> DecisionEvent {
        DecisionEvent {
            actor_id: "U2".into(),
            token: token.into(),
            message: MessageRef::new("D2", "1700000000.000100"),
            outcome,
        }
    }

    fn dispatcher(slack: &Arc<FakeSlack>, guard: Option<DecisionGuard>) -> DecisionDispatcher {
        DecisionDispatcher::new(Notifier::new(slack.clone()), guard)
    }

    #[tokio::test]
    async fn acks_before_any_platform_call() {
        let slack = Arc::new(FakeSlack::default());
        let dispatcher = dispatcher(&slack, None);
        let token = token::encode("U1", "Buy a laptop");

        dispatcher
            .dispatch(slack.recording_ack(), event(Outcome::Approved, token.as_str()))
            .await;

        let calls = slack.calls();
        assert_eq!(calls.first(), Some(&Call::Ack));
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn malformed_token_never_reaches_notifier() {
        let slack = Arc::new(FakeSlack::default());
        let dispatcher = dispatcher(&slack, None);

        for bad in ["", "{", r#"{"requesterId":"U1"}"#, "approve"] {
            let result = dispatcher
                .dispatch(slack.recording_ack(), event(Outcome::Approved, bad))
                .await;
            assert_eq!(result, DispatchResult::MalformedToken);
        }

        assert!(slack.calls().iter().all(|c| *c == Call::Ack));
        assert_eq!(slack.calls().len(), 4);
    }

    #[tokio::test]
    async fn outcomes_share_one_transition() {
        for outcome in Outcome::ALL {
            let slack = Arc::new(FakeSlack::default());
            let dispatcher = dispatcher(&slack, None);
            let token = token::encode("U1", "Buy a laptop");

            let result = dispatcher
                .dispatch(Ack::noop(), event(outcome, token.as_str()))
                .await;
            assert!(matches!(result, DispatchResult::Delivered(_)));

            let calls = slack.calls();
            let Call::PostMessage { channel, content } = &calls[0] else {
                panic!("expected requester DM first");
            };
            assert_eq!(channel, "U1");
            assert!(content.text.contains(outcome.word()));
            let Call::UpdateMessage { content, .. } = &calls[1] else {
                panic!("expected update second");
            };
            assert!(content.text.contains(outcome.word()));
        }
    }

    #[tokio::test]
    async fn double_click_runs_twice_without_guard() {
        let slack = Arc::new(FakeSlack::default());
        let dispatcher = dispatcher(&slack, None);
        let token = token::encode("U1", "Buy a laptop");

        dispatcher
            .dispatch(Ack::noop(), event(Outcome::Approved, token.as_str()))
            .await;
        dispatcher
            .dispatch(Ack::noop(), event(Outcome::Rejected, token.as_str()))
            .await;

        assert_eq!(slack.calls().len(), 4);
    }

    #[tokio::test]
    async fn guard_drops_second_decision() {
        let slack = Arc::new(FakeSlack::default());
        let dispatcher = dispatcher(&slack, Some(DecisionGuard::new(Duration::from_secs(60))));
        let token = token::encode("U1", "Buy a laptop");

        let first = dispatcher
            .dispatch(slack.recording_ack(), event(Outcome::Approved, token.as_str()))
            .await;
        let second = dispatcher
            .dispatch(slack.recording_ack(), event(Outcome::Rejected, token.as_str()))
            .await;

        assert!(matches!(first, DispatchResult::Delivered(_)));
        assert_eq!(second, DispatchResult::Duplicate);
        // ack, DM, update, ack
        assert_eq!(slack.calls().len(), 4);
        assert_eq!(slack.calls().last(), Some(&Call::Ack));
    }

    #[tokio::test]
    async fn guard_allows_retry_after_total_delivery_failure() {
        let slack = Arc::new(FakeSlack {
            fail_post_message: true,
            fail_update_message: true,
            ..Default::default()
        });
        let dispatcher = dispatcher(&slack, Some(DecisionGuard::new(Duration::from_secs(60))));
        let token = token::encode("U1", "Buy a laptop");

        for _ in 0..2 {
            let result = dispatcher
                .dispatch(Ack::noop(), event(Outcome::Approved, token.as_str()))
                .await;
            assert_eq!(
                result,
                DispatchResult::Delivered(DeliveryReport {
                    requester_notified: false,
                    notification_finalized: false,
                })
            );
        }
        assert_eq!(slack.calls().len(), 4);
    }

    #[tokio::test]
    async fn guard_keeps_claim_after_partial_delivery() {
        let slack = Arc::new(FakeSlack {
            fail_update_message: true,
            ..Default::default()
        });
        let dispatcher = dispatcher(&slack, Some(DecisionGuard::new(Duration::from_secs(60))));
        let token = token::encode("U1", "Buy a laptop");

        dispatcher
            .dispatch(Ack::noop(), event(Outcome::Approved, token.as_str()))
            .await;
        let second = dispatcher
            .dispatch(Ack::noop(), event(Outcome::Approved, token.as_str()))
            .await;
        assert_eq!(second, DispatchResult::Duplicate);
    }

    #[test]
    fn event_from_block_actions() {
        let action = PayloadAction {
            action_id: "reject_button".into(),
            value: Some("tok".into()),
        };
        let event = DecisionEvent::from_block_actions(
            "U2",
            Some(&PayloadChannel { id: "D2".into() }),
            Some(&PayloadMessage { ts: "1.5".into() }),
            None,
            &action,
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.outcome, Outcome::Rejected);
        assert_eq!(event.message, MessageRef::new("D2", "1.5"));
        assert_eq!(event.token, "tok");
    }

    #[test]
    fn event_falls_back_to_container() {
        let action = PayloadAction {
            action_id: "approve_button".into(),
            value: Some("tok".into()),
        };
        let container = PayloadContainer {
            channel_id: Some("D9".into()),
            message_ts: Some("9.9".into()),
        };
        let event = DecisionEvent::from_block_actions("U2", None, None, Some(&container), &action)
            .unwrap()
            .unwrap();
        assert_eq!(event.message, MessageRef::new("D9", "9.9"));
    }

    #[test]
    fn non_decision_action_is_ignored() {
        let action = PayloadAction {
            action_id: "approver".into(),
            value: None,
        };
        assert_eq!(
            DecisionEvent::from_block_actions("U2", None, None, None, &action).unwrap(),
            None
        );
    }

    #[test]
    fn decision_without_value_is_malformed() {
        let action = PayloadAction {
            action_id: "approve_button".into(),
            value: None,
        };
        let err = DecisionEvent::from_block_actions(
            "U2",
            Some(&PayloadChannel { id: "D2".into() }),
            Some(&PayloadMessage { ts: "1.5".into() }),
            None,
            &action,
        )
        .unwrap_err();
        assert!(matches!(err, ApprovalError::MalformedToken(_)));
    }

    #[test]
    fn decision_without_message_is_invalid() {
        let action = PayloadAction {
            action_id: "approve_button".into(),
            value: Some("tok".into()),
        };
        let err = DecisionEvent::from_block_actions("U2", None, None, None, &action).unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidPayload(_)));
    }
}

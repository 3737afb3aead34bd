//! Inbound Slack payloads: slash commands and interactions.
//!
//! Everything Slack sends is parsed into these types at the boundary, so
//! handlers never touch raw JSON.

use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ApprovalError;

/// Fields of a slash command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SlashCommand {
    pub command: String,
    pub user_id: String,
    pub trigger_id: String,
    #[serde(default)]
    pub text: String,
}

impl SlashCommand {
    /// Parse the `application/x-www-form-urlencoded` body Slack posts.
    pub fn from_form(body: &[u8]) -> Result<Self, ApprovalError> {
        from_form_fields(body)
    }
}

/// Interaction payloads. Only the kinds the approval flow reacts to are typed.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionPayload {
    ViewSubmission {
        user: PayloadUser,
        view: SubmittedView,
    },
    BlockActions {
        user: PayloadUser,
        #[serde(default)]
        channel: Option<PayloadChannel>,
        #[serde(default)]
        message: Option<PayloadMessage>,
        #[serde(default)]
        container: Option<PayloadContainer>,
        #[serde(default)]
        actions: Vec<PayloadAction>,
    },
    #[serde(other)]
    Unsupported,
}

impl InteractionPayload {
    /// Parse an HTTP interaction body, which wraps the JSON in a `payload` form field.
    pub fn from_form(body: &[u8]) -> Result<Self, ApprovalError> {
        let raw = url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "payload")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| ApprovalError::InvalidPayload("missing payload field".into()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ApprovalError> {
        serde_json::from_str(raw)
            .map_err(|e| ApprovalError::InvalidPayload(format!("interaction payload: {e}")))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ApprovalError> {
        serde_json::from_value(value)
            .map_err(|e| ApprovalError::InvalidPayload(format!("interaction payload: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayloadUser {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayloadChannel {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayloadMessage {
    pub ts: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayloadContainer {
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub message_ts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayloadAction {
    pub action_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// A submitted modal and its input state.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedView {
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub state: ViewState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewState {
    /// `block_id -> action_id -> value`.
    #[serde(default)]
    pub values: HashMap<String, HashMap<String, InputValue>>,
}

/// The submitted value of one input element.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputValue {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectedOption {
    pub value: String,
}

impl SubmittedView {
    fn input(&self, block_id: &str, action_id: &str) -> Result<&InputValue, ApprovalError> {
        self.state
            .values
            .get(block_id)
            .and_then(|block| block.get(action_id))
            .ok_or_else(|| ApprovalError::InvalidPayload(format!("missing input {block_id}.{action_id}")))
    }

    /// Text typed into a `plain_text_input`.
    pub fn text_value(&self, block_id: &str, action_id: &str) -> Result<&str, ApprovalError> {
        self.input(block_id, action_id)?
            .value
            .as_deref()
            .ok_or_else(|| ApprovalError::InvalidPayload(format!("{block_id}.{action_id} has no value")))
    }

    /// Value of the option picked in a select menu.
    pub fn selected_value(&self, block_id: &str, action_id: &str) -> Result<&str, ApprovalError> {
        self.input(block_id, action_id)?
            .selected_option
            .as_ref()
            .map(|opt| opt.value.as_str())
            .ok_or_else(|| {
                ApprovalError::InvalidPayload(format!("{block_id}.{action_id} has no selected option"))
            })
    }
}

/// Decode form fields into a typed struct. Repeated keys keep the last value.
fn from_form_fields<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApprovalError> {
    let fields: serde_json::Map<String, serde_json::Value> = url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), serde_json::Value::String(v.into_owned())))
        .collect();
    serde_json::from_value(serde_json::Value::Object(fields))
        .map_err(|e| ApprovalError::InvalidPayload(format!("form body: {e}")))
}

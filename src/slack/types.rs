//! Slack Web API records and Block Kit surfaces.

use serde::{Deserialize, Serialize};

// ── Directory ───────────────────────────────────────────────────────────

/// A member record from `users.list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    /// Handle.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub real_name: Option<String>,
}

impl DirectoryUser {
    /// Display name when one is set, handle otherwise.
    pub fn display_label(&self) -> &str {
        self.profile
            .real_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.name)
    }
}

// ── Messages ────────────────────────────────────────────────────────────

/// Points at one posted message: the conversation plus its `ts`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel: String,
    pub ts: String,
}

impl MessageRef {
    pub fn new(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
        }
    }
}

impl std::fmt::Display for MessageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.channel, self.ts)
    }
}

/// Text plus optional blocks for `chat.postMessage` / `chat.update`.
///
/// `blocks: Some(vec![])` is sent as an explicit empty array, which strips
/// every block from an updated message. `None` leaves the field out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            blocks: None,
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = Some(blocks);
        self
    }

    /// Every button carried by this content.
    pub fn buttons(&self) -> impl Iterator<Item = &Element> {
        self.blocks
            .iter()
            .flatten()
            .filter_map(|block| match block {
                Block::Actions { elements, .. } => Some(elements),
                _ => None,
            })
            .flatten()
            .filter(|el| matches!(el, Element::Button { .. }))
    }
}

// ── Block Kit ───────────────────────────────────────────────────────────

/// A text object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    PlainText { text: String },
    Mrkdwn { text: String },
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PlainText { text } | Self::Mrkdwn { text } => text,
        }
    }
}

/// Layout blocks used by the approval flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        text: Text,
    },
    Actions {
        block_id: String,
        elements: Vec<Element>,
    },
    Input {
        block_id: String,
        label: Text,
        element: Element,
    },
}

/// Interactive elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button {
        action_id: String,
        text: Text,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<ButtonStyle>,
    },
    StaticSelect {
        action_id: String,
        options: Vec<SelectOption>,
    },
    PlainTextInput {
        action_id: String,
        #[serde(default)]
        multiline: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

/// One entry of a select menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub text: Text,
    pub value: String,
}

/// A modal view for `views.open`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "modal")]
pub struct View {
    pub callback_id: String,
    pub title: Text,
    pub submit: Text,
    pub blocks: Vec<Block>,
}

//! Slack platform adapter: Web API client, Block Kit types, inbound payloads.

pub mod client;
pub mod payload;
pub mod signature;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::error::SlackError;

pub use client::SlackClient;
pub use payload::{InteractionPayload, SlashCommand, SubmittedView};
pub use types::{
    Block, ButtonStyle, DirectoryUser, Element, MessageContent, MessageRef, SelectOption, Text,
    View,
};

/// The slice of the Slack Web API the approval flow depends on.
///
/// Built once at startup and shared by every handler, so tests can swap in a fake.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Every member of the workspace directory (`users.list`).
    async fn list_users(&self) -> Result<Vec<DirectoryUser>, SlackError>;

    /// Open a modal in response to a trigger (`views.open`).
    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), SlackError>;

    /// Post a message to a channel or user (`chat.postMessage`).
    async fn post_message(
        &self,
        channel: &str,
        content: &MessageContent,
    ) -> Result<MessageRef, SlackError>;

    /// Replace an existing message (`chat.update`).
    async fn update_message(
        &self,
        message: &MessageRef,
        content: &MessageContent,
    ) -> Result<(), SlackError>;
}

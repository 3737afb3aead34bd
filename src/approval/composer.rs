//! Approver-selection modal.

use crate::slack::types::{Block, DirectoryUser, Element, SelectOption, Text, View};

pub const APPROVAL_MODAL_CALLBACK: &str = "approval_modal";
pub const APPROVER_BLOCK: &str = "approver_block";
pub const APPROVER_ACTION: &str = "approver";
pub const APPROVAL_TEXT_BLOCK: &str = "approval_text_block";
pub const APPROVAL_TEXT_ACTION: &str = "approval_text";

/// One select option per eligible approver, in directory order.
///
/// Bots and the invoking user are never eligible.
pub fn approver_options(invoker_id: &str, users: &[DirectoryUser]) -> Vec<SelectOption> {
    users
        .iter()
        .filter(|user| !user.is_bot && user.id != invoker_id)
        .map(|user| SelectOption {
            text: Text::plain(user.display_label()),
            value: user.id.clone(),
        })
        .collect()
}

/// The "Request Approval" modal.
pub fn approval_modal(options: Vec<SelectOption>) -> View {
    View {
        callback_id: APPROVAL_MODAL_CALLBACK.into(),
        title: Text::plain("Request Approval"),
        submit: Text::plain("Submit"),
        blocks: vec![
            Block::Input {
                block_id: APPROVER_BLOCK.into(),
                label: Text::plain("Select Approver"),
                element: Element::StaticSelect {
                    action_id: APPROVER_ACTION.into(),
                    options,
                },
            },
            Block::Input {
                block_id: APPROVAL_TEXT_BLOCK.into(),
                label: Text::plain("Approval Text"),
                element: Element::PlainTextInput {
                    action_id: APPROVAL_TEXT_ACTION.into(),
                    multiline: true,
                },
            },
        ],
    }
}

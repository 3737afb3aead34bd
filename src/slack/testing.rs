//! Recording fake of [`SlackApi`] for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::SlackApi;
use super::types::{DirectoryUser, MessageContent, MessageRef, View};
use crate::error::SlackError;

/// One recorded call, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Ack,
    ListUsers,
    OpenView {
        trigger_id: String,
        view: View,
    },
    PostMessage {
        channel: String,
        content: MessageContent,
    },
    UpdateMessage {
        message: MessageRef,
        content: MessageContent,
    },
}

#[derive(Default)]
pub(crate) struct FakeSlack {
    pub users: Vec<DirectoryUser>,
    pub fail_list_users: bool,
    pub fail_open_view: bool,
    pub fail_post_message: bool,
    pub fail_update_message: bool,
    pub calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeSlack {
    pub fn with_users(users: Vec<DirectoryUser>) -> Self {
        Self {
            users,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// An ack hook that records into the same call log.
    pub fn recording_ack(&self) -> crate::approval::Ack {
        let calls = Arc::clone(&self.calls);
        crate::approval::Ack::new(move || calls.lock().unwrap().push(Call::Ack))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn failure(method: &str) -> SlackError {
        SlackError::Api {
            method: method.into(),
            error: "fatal_error".into(),
        }
    }
}

pub(crate) fn human(id: &str, name: &str, real_name: Option<&str>) -> DirectoryUser {
    DirectoryUser {
        id: id.into(),
        name: name.into(),
        is_bot: false,
        profile: super::types::UserProfile {
            real_name: real_name.map(String::from),
        },
    }
}

pub(crate) fn bot(id: &str, name: &str) -> DirectoryUser {
    DirectoryUser {
        is_bot: true,
        ..human(id, name, None)
    }
}

#[async_trait]
impl SlackApi for FakeSlack {
    async fn list_users(&self) -> Result<Vec<DirectoryUser>, SlackError> {
        self.record(Call::ListUsers);
        if self.fail_list_users {
            return Err(Self::failure("users.list"));
        }
        Ok(self.users.clone())
    }

    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), SlackError> {
        self.record(Call::OpenView {
            trigger_id: trigger_id.into(),
            view: view.clone(),
        });
        if self.fail_open_view {
            return Err(Self::failure("views.open"));
        }
        Ok(())
    }

    async fn post_message(
        &self,
        channel: &str,
        content: &MessageContent,
    ) -> Result<MessageRef, SlackError> {
        self.record(Call::PostMessage {
            channel: channel.into(),
            content: content.clone(),
        });
        if self.fail_post_message {
            return Err(Self::failure("chat.postMessage"));
        }
        Ok(MessageRef::new(format!("D-{channel}"), "1700000000.000100"))
    }

    async fn update_message(
        &self,
        message: &MessageRef,
        content: &MessageContent,
    ) -> Result<(), SlackError> {
        self.record(Call::UpdateMessage {
            message: message.clone(),
            content: content.clone(),
        });
        if self.fail_update_message {
            return Err(Self::failure("chat.update"));
        }
        Ok(())
    }
}

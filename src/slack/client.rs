//! Slack Web API client over `reqwest`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::SlackApi;
use super::types::{DirectoryUser, MessageContent, MessageRef, View};
use crate::error::SlackError;

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Page size for `users.list`. Slack recommends no more than 200.
const USERS_PAGE_LIMIT: u32 = 200;

/// Slack Web API client authenticated with the bot token.
pub struct SlackClient {
    bot_token: SecretString,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OpenView<'a> {
    trigger_id: &'a str,
    view: &'a View,
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    #[serde(flatten)]
    content: &'a MessageContent,
}

#[derive(Serialize)]
struct UpdateMessage<'a> {
    channel: &'a str,
    ts: &'a str,
    #[serde(flatten)]
    content: &'a MessageContent,
}

#[derive(Deserialize)]
struct UsersPage {
    #[serde(default)]
    members: Vec<DirectoryUser>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct PostedMessage {
    channel: String,
    ts: String,
}

#[derive(Deserialize)]
struct ConnectionUrl {
    url: String,
}

impl SlackClient {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            base_url: SLACK_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different API root (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        method: &str,
        token: &SecretString,
        body: Option<&B>,
    ) -> Result<serde_json::Value, SlackError> {
        let mut request = self
            .client
            .post(self.api_url(method))
            .bearer_auth(token.expose_secret());
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await.map_err(|e| SlackError::Http {
            method: method.into(),
            reason: e.to_string(),
        })?;
        read_envelope(method, resp).await
    }

    async fn get(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, SlackError> {
        let resp = self
            .client
            .get(self.api_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| SlackError::Http {
                method: method.into(),
                reason: e.to_string(),
            })?;
        read_envelope(method, resp).await
    }

    /// Ask for a socket mode WebSocket URL (`apps.connections.open`).
    pub async fn open_connection(&self, app_token: &SecretString) -> Result<String, SlackError> {
        let data = self
            .post_json::<()>("apps.connections.open", app_token, None)
            .await?;
        let conn: ConnectionUrl = decode_response("apps.connections.open", data)?;
        Ok(conn.url)
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn list_users(&self) -> Result<Vec<DirectoryUser>, SlackError> {
        let mut users = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut query = vec![("limit", USERS_PAGE_LIMIT.to_string())];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }

            let data = self.get("users.list", &query).await?;
            let page: UsersPage = decode_response("users.list", data)?;
            users.extend(page.members);

            cursor = page
                .response_metadata
                .and_then(|meta| meta.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                break;
            }
        }

        tracing::debug!(count = users.len(), "Fetched Slack directory");
        Ok(users)
    }

    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), SlackError> {
        self.post_json(
            "views.open",
            &self.bot_token,
            Some(&OpenView { trigger_id, view }),
        )
        .await?;
        Ok(())
    }

    async fn post_message(
        &self,
        channel: &str,
        content: &MessageContent,
    ) -> Result<MessageRef, SlackError> {
        let data = self
            .post_json(
                "chat.postMessage",
                &self.bot_token,
                Some(&PostMessage { channel, content }),
            )
            .await?;
        let posted: PostedMessage = decode_response("chat.postMessage", data)?;
        Ok(MessageRef::new(posted.channel, posted.ts))
    }

    async fn update_message(
        &self,
        message: &MessageRef,
        content: &MessageContent,
    ) -> Result<(), SlackError> {
        self.post_json(
            "chat.update",
            &self.bot_token,
            Some(&UpdateMessage {
                channel: &message.channel,
                ts: &message.ts,
                content,
            }),
        )
        .await?;
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Check HTTP status and the `ok`/`error` envelope every Web API method returns.
async fn read_envelope(
    method: &str,
    resp: reqwest::Response,
) -> Result<serde_json::Value, SlackError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SlackError::Http {
            method: method.into(),
            reason: format!("HTTP {status}: {body}"),
        });
    }

    let data: serde_json::Value = resp.json().await.map_err(|e| SlackError::InvalidResponse {
        method: method.into(),
        reason: e.to_string(),
    })?;

    check_ok(method, data)
}

fn check_ok(method: &str, data: serde_json::Value) -> Result<serde_json::Value, SlackError> {
    if data.get("ok").and_then(serde_json::Value::as_bool) == Some(true) {
        return Ok(data);
    }

    let error = data
        .get("error")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown_error")
        .to_string();
    Err(SlackError::Api {
        method: method.into(),
        error,
    })
}

fn decode_response<T: serde::de::DeserializeOwned>(
    method: &str,
    data: serde_json::Value,
) -> Result<T, SlackError> {
    serde_json::from_value(data).map_err(|e| SlackError::InvalidResponse {
        method: method.into(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slack_api_url() {
        let client = SlackClient::new(SecretString::from("xoxb-1"));
        assert_eq!(
            client.api_url("chat.postMessage"),
            "https://slack.com/api/chat.postMessage"
        );
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client =
            SlackClient::new(SecretString::from("xoxb-1")).with_base_url("http://127.0.0.1:9/api/");
        assert_eq!(client.api_url("users.list"), "http://127.0.0.1:9/api/users.list");
    }

    #[test]
    fn check_ok_passes_ok_envelope() {
        let data = serde_json::json!({"ok": true, "ts": "1.2"});
        assert_eq!(check_ok("chat.update", data.clone()).unwrap(), data);
    }

    #[test]
    fn check_ok_maps_api_error() {
        let err = check_ok(
            "chat.postMessage",
            serde_json::json!({"ok": false, "error": "channel_not_found"}),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SlackError::Api { ref method, ref error }
                if method == "chat.postMessage" && error == "channel_not_found"
        ));
    }

    #[test]
    fn check_ok_without_ok_field() {
        let err = check_ok("views.open", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, SlackError::Api { ref error, .. } if error == "unknown_error"));
    }

    #[test]
    fn post_message_body_flattens_content() {
        let content = MessageContent::text("hello").with_blocks(vec![]);
        let body = serde_json::to_value(PostMessage {
            channel: "U2",
            content: &content,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"channel": "U2", "text": "hello", "blocks": []})
        );
    }

    #[tokio::test]
    async fn unreachable_api_is_http_error() {
        let client =
            SlackClient::new(SecretString::from("xoxb-1")).with_base_url("http://127.0.0.1:1/api");
        let err = client.list_users().await.unwrap_err();
        assert!(matches!(err, SlackError::Http { ref method, .. } if method == "users.list"));
    }
}

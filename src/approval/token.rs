//! Request state token.
//!
//! There is no store: the requester and the request text ride on the approver's
//! buttons as a small JSON object, and come back with the click.

use serde::{Deserialize, Serialize};

use crate::error::ApprovalError;

/// Slack caps a button `value` at 2000 characters.
pub const MAX_TOKEN_LEN: usize = 2000;

/// The context needed to resume a request when a decision arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestState {
    #[serde(rename = "requesterId")]
    pub requester_id: String,
    #[serde(rename = "approvalText")]
    pub body: String,
}

/// An encoded [`RequestState`]. Opaque to everything but [`decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, which is what Slack's value limit counts.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Fail rather than let Slack reject or cut a value that is too long.
    pub fn check_fits_button(&self) -> Result<(), ApprovalError> {
        let len = self.char_len();
        if len > MAX_TOKEN_LEN {
            return Err(ApprovalError::TokenTooLong {
                len,
                max: MAX_TOKEN_LEN,
            });
        }
        Ok(())
    }
}

/// Encode requester and body. JSON escaping keeps control characters out of the value.
pub fn encode(requester_id: &str, body: &str) -> Token {
    Token(
        serde_json::json!({
            "requesterId": requester_id,
            "approvalText": body,
        })
        .to_string(),
    )
}

/// Decode a token taken off a button.
///
/// Anything other than an object with exactly the two string fields is
/// `MalformedToken`; no partial state is ever returned.
pub fn decode(token: &str) -> Result<RequestState, ApprovalError> {
    serde_json::from_str(token).map_err(|e| ApprovalError::MalformedToken(e.to_string()))
}

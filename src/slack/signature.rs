//! Slack request signing (v0 HMAC-SHA256).
//!
//! Slack signs `v0:{timestamp}:{body}` with the app's signing secret and sends
//! the hex digest as `X-Slack-Signature: v0=<hex>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Requests older (or newer) than this are rejected to block replays.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60 * 5;

const VERSION: &str = "v0";

fn mac_for(secret: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac
}

/// Compute the `X-Slack-Signature` value for a request.
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let digest = mac_for(secret, timestamp, body).finalize().into_bytes();
    format!("{VERSION}={}", hex::encode(digest))
}

/// Verify a request signature against the signing secret.
///
/// `now` is the current unix time in seconds.
pub fn verify(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_string()))?;

    if now.abs_diff(sent_at) > MAX_CLOCK_SKEW_SECS.unsigned_abs() {
        return Err(SignatureError::Stale {
            age_secs: now.saturating_sub(sent_at),
        });
    }

    let provided = signature
        .strip_prefix("v0=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or(SignatureError::Mismatch)?;

    mac_for(secret, timestamp, body)
        .verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

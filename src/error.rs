//! Error types for the approval bot.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Slack Web API errors.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("Slack {method} request failed: {reason}")]
    Http { method: String, reason: String },

    #[error("Slack {method} returned error: {error}")]
    Api { method: String, error: String },

    #[error("Invalid response from Slack {method}: {reason}")]
    InvalidResponse { method: String, reason: String },

    #[error("Socket mode connection failed: {0}")]
    Socket(String),
}

/// Errors raised by the approval lifecycle.
///
/// Handlers never propagate these past their own boundary; they are logged.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(#[source] SlackError),

    #[error("Malformed request token: {0}")]
    MalformedToken(String),

    #[error("Request token is {len} chars, Slack accepts at most {max}")]
    TokenTooLong { len: usize, max: usize },

    #[error("Delivery failed at {step}: {source}")]
    DeliveryFailure {
        step: &'static str,
        #[source]
        source: SlackError,
    },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Request signature verification errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing header {0}")]
    MissingHeader(&'static str),

    #[error("Invalid request timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Request timestamp is {age_secs}s away from now")]
    Stale { age_secs: i64 },

    #[error("Signature mismatch")]
    Mismatch,
}

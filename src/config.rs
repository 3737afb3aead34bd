//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default listen port for HTTP mode.
pub const DEFAULT_PORT: u16 = 3000;

/// Default slash command that opens the approval modal.
pub const DEFAULT_COMMAND: &str = "/approval-test";

/// How the bot receives events from Slack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Slack posts events to our request URLs.
    Http,
    /// We hold a WebSocket opened via `apps.connections.open`.
    Socket,
}

/// Bot configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot user OAuth token (`xoxb-...`).
    pub bot_token: SecretString,
    /// Signing secret used to verify inbound HTTP requests.
    pub signing_secret: Option<SecretString>,
    /// App-level token (`xapp-...`), socket mode only.
    pub app_token: Option<SecretString>,
    pub mode: ConnectionMode,
    /// Listen port for HTTP mode.
    pub port: u16,
    /// Slash command that triggers the approval modal.
    pub command: String,
    /// When set, duplicate decisions on the same message are dropped for this long.
    /// A TTL of 0 leaves the guard off.
    pub decision_guard_ttl: Option<Duration>,
}

impl BotConfig {
    /// Load configuration from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("SLACK_BOT_TOKEN")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("SLACK_BOT_TOKEN".into()))?;

        let socket_mode = get("SLACK_SOCKET_MODE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let mode = if socket_mode {
            ConnectionMode::Socket
        } else {
            ConnectionMode::Http
        };

        let signing_secret = get("SLACK_SIGNING_SECRET").map(SecretString::from);
        let app_token = get("SLACK_APP_TOKEN").map(SecretString::from);

        match mode {
            ConnectionMode::Http if signing_secret.is_none() => {
                return Err(ConfigError::MissingRequired {
                    key: "SLACK_SIGNING_SECRET".into(),
                    hint: "HTTP mode verifies every request against the signing secret.".into(),
                });
            }
            ConnectionMode::Socket if app_token.is_none() => {
                return Err(ConfigError::MissingRequired {
                    key: "SLACK_APP_TOKEN".into(),
                    hint: "Socket mode needs an app-level token with connections:write.".into(),
                });
            }
            _ => {}
        }

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".into(),
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let command = get("APPROVAL_COMMAND").unwrap_or_else(|| DEFAULT_COMMAND.to_string());
        if !command.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                key: "APPROVAL_COMMAND".into(),
                message: format!("slash commands start with '/', got {command:?}"),
            });
        }

        let decision_guard_ttl = match get("APPROVAL_DECISION_GUARD_TTL_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                    key: "APPROVAL_DECISION_GUARD_TTL_SECS".into(),
                    message: e.to_string(),
                })?;
                // 0 would admit every click, same as no guard
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            bot_token,
            signing_secret,
            app_token,
            mode,
            port,
            command,
            decision_guard_ttl,
        })
    }
}

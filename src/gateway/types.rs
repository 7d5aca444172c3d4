//! Gateway events, options and error definitions.

use std::time::Duration;
use thiserror::Error;

use crate::config::schema::{AgentConfig, ReconnectionConfig};

/// Notifications delivered by the gateway client, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The websocket handshake completed.
    Connected,
    /// The websocket closed, whether requested or not.
    Disconnected,
    /// Someone invited the bot account into a group.
    GroupInvite(GroupInviteRequest),
}

impl GatewayEvent {
    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayEvent::Connected => "connected",
            GatewayEvent::Disconnected => "disconnected",
            GatewayEvent::GroupInvite(_) => "group_invite",
        }
    }
}

/// A pending group invite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInviteRequest {
    /// Opaque request token the gateway expects back when answering.
    pub flag: String,
    /// Account that sent the invite.
    pub user_id: i64,
    /// Group the bot was invited into.
    pub group_id: i64,
}

/// Connection options for the gateway client.
#[derive(Clone)]
pub struct GatewayOptions {
    /// Websocket base URL.
    pub base_url: String,
    /// Access token, sent as the `access_token` query parameter.
    pub access_token: String,
    /// Reconnection policy after an unexpected close.
    pub reconnection: ReconnectionConfig,
    /// Turn failed action responses into errors.
    pub throw_on_error: bool,
    /// Deadline for an action response.
    pub action_timeout: Duration,
}

impl From<&AgentConfig> for GatewayOptions {
    fn from(config: &AgentConfig) -> Self {
        Self {
            base_url: config.napcat_ws.clone(),
            access_token: config.napcat_token.clone(),
            reconnection: config.reconnection.clone(),
            throw_on_error: config.throw_on_error,
            action_timeout: Duration::from_millis(config.action_timeout_ms),
        }
    }
}

impl std::fmt::Debug for GatewayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayOptions")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("reconnection", &self.reconnection)
            .field("throw_on_error", &self.throw_on_error)
            .field("action_timeout", &self.action_timeout)
            .finish()
    }
}

/// Errors that can occur while talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The configured URL could not be turned into a websocket request.
    #[error("Invalid gateway URL '{0}'")]
    InvalidUrl(String),

    /// Websocket handshake or transport failure.
    #[error("Websocket error: {0}")]
    Websocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be encoded or decoded.
    #[error("Malformed frame: {0}")]
    Codec(#[from] serde_json::Error),

    /// `connect` was called on a client that already connected once.
    #[error("Gateway client is already connected")]
    AlreadyConnected,

    /// No live connection to send on.
    #[error("Gateway is not connected")]
    NotConnected,

    /// The connection dropped before the action was answered.
    #[error("Gateway disconnected before '{0}' was answered")]
    Disconnected(String),

    /// No response within the action timeout.
    #[error("Action '{action}' timed out after {timeout_ms} ms")]
    Timeout { action: String, timeout_ms: u64 },

    /// The gateway answered with a failure status.
    #[error("Action '{action}' failed with retcode {retcode}: {message}")]
    ActionFailed {
        action: String,
        retcode: i64,
        message: String,
    },
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

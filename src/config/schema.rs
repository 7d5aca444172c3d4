//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the agent.
//! Keys are camelCase so the same `config.json` can be shared with other
//! NapCat tooling.

use serde::{Deserialize, Serialize};

/// Root configuration for the invite agent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Websocket base URL of the NapCat gateway (e.g., "ws://127.0.0.1:3001").
    pub napcat_ws: String,

    /// Access token presented to the gateway.
    #[serde(default)]
    pub napcat_token: String,

    /// Automatic reconnection settings.
    #[serde(default)]
    pub reconnection: ReconnectionConfig,

    /// Surface failed action responses as errors.
    #[serde(default = "default_throw_on_error")]
    pub throw_on_error: bool,

    /// Time to wait for an action response in milliseconds.
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,

    /// Graceful shutdown settings.
    #[serde(default)]
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AgentConfig {
    /// Minimal configuration for the given gateway endpoint.
    pub fn new(napcat_ws: impl Into<String>, napcat_token: impl Into<String>) -> Self {
        Self {
            napcat_ws: napcat_ws.into(),
            napcat_token: napcat_token.into(),
            reconnection: ReconnectionConfig::default(),
            throw_on_error: default_throw_on_error(),
            action_timeout_ms: default_action_timeout_ms(),
            shutdown: ShutdownConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_throw_on_error() -> bool {
    true
}

fn default_action_timeout_ms() -> u64 {
    10_000
}

/// Reconnection policy handed to the gateway client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconnectionConfig {
    /// Reconnect after an unexpected close.
    pub enable: bool,

    /// Maximum connection attempts per outage.
    pub attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    pub delay_ms: u64,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            enable: true,
            attempts: 10,
            delay_ms: 5000,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShutdownConfig {
    /// Upper bound on waiting for the gateway to confirm closure.
    pub timeout_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus endpoint bind address; metrics export is off when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}

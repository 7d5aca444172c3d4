//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the gateway URL is a websocket URL
//! - Validate value ranges (timeouts > 0, attempts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::AgentConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("napcatWs is not a valid URL: {0}")]
    InvalidUrl(String),

    #[error("napcatWs must use ws:// or wss://, got {0}://")]
    UnsupportedScheme(String),

    #[error("reconnection.attempts must be at least 1 when reconnection is enabled")]
    NoReconnectAttempts,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("observability.metricsAddress is not a socket address: {0}")]
    InvalidMetricsAddress(String),
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.napcat_ws) {
        Ok(url) => {
            if !matches!(url.scheme(), "ws" | "wss") {
                errors.push(ValidationError::UnsupportedScheme(url.scheme().to_string()));
            }
        }
        Err(e) => errors.push(ValidationError::InvalidUrl(e.to_string())),
    }

    if config.reconnection.enable && config.reconnection.attempts == 0 {
        errors.push(ValidationError::NoReconnectAttempts);
    }
    if config.reconnection.enable && config.reconnection.delay_ms == 0 {
        errors.push(ValidationError::ZeroDuration("reconnection.delayMs"));
    }
    if config.action_timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration("actionTimeoutMs"));
    }
    if config.shutdown.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration("shutdown.timeoutMs"));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

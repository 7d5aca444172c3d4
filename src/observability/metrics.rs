//! Metrics collection and exposition.
//!
//! # Metrics
//! - `agent_events_total` (counter): gateway events handled, by kind
//! - `agent_invites_approved_total` (counter): group invites approved
//! - `gateway_connected` (gauge): 1=connected, 0=disconnected
//! - `gateway_reconnect_attempts_total` (counter): reconnection attempts
//! - `agent_shutdowns_total` (counter): shutdowns, by outcome
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - Prometheus export only when an address is configured

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one handled gateway event.
pub fn record_event(kind: &'static str) {
    metrics::counter!("agent_events_total", "kind" => kind).increment(1);
}

/// Count one approved group invite.
pub fn record_invite_approved() {
    metrics::counter!("agent_invites_approved_total").increment(1);
}

/// Track gateway connectivity.
pub fn set_gateway_connected(connected: bool) {
    metrics::gauge!("gateway_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Count one reconnection attempt.
pub fn record_reconnect_attempt() {
    metrics::counter!("gateway_reconnect_attempts_total").increment(1);
}

/// Count one shutdown by its outcome label.
pub fn record_shutdown(outcome: &'static str) {
    metrics::counter!("agent_shutdowns_total", "outcome" => outcome).increment(1);
}

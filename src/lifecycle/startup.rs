//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the gateway client from configuration
//! - Connect, then start the agent dispatch loop
//! - Hand interrupts to the shutdown coordinator and report its outcome
//!
//! # Design Decisions
//! - Fail fast: initial connect failure is fatal
//! - An interrupt while the initial connect is pending abandons it with a
//!   forced outcome; a stalled handshake never swallows Ctrl+C
//! - A failed approval is fatal while running; once shutdown has begun the
//!   shutdown outcome decides the exit code
//! - The event stream ending on its own (reconnection gave up) ends the run
//!   with `ConnectionLost` (exit 0); nothing is left to serve

use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::agent::{AgentError, InviteAgent};
use crate::observability::metrics;
use crate::config::AgentConfig;
use crate::gateway::{GatewayError, GatewayOptions, NapcatClient};
use crate::lifecycle::shutdown::{ShutdownCoordinator, ShutdownOutcome, ShutdownState};
use crate::lifecycle::signal;

/// Errors that stop the agent before a shutdown outcome is reached.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Agent task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Run the agent until shutdown.
///
/// `interrupts` delivers stop requests; the first begins a graceful
/// shutdown, the second forces it. An interrupt before the connection is up
/// abandons the connect attempt.
pub async fn run_agent<S>(
    config: &AgentConfig,
    mut interrupts: mpsc::UnboundedReceiver<S>,
) -> Result<ShutdownOutcome, StartupError> {
    let (client, events) = NapcatClient::new(GatewayOptions::from(config));
    let (closed, close_signal) = signal::channel();

    tokio::select! {
        connected = client.connect() => connected?,
        Some(_) = interrupts.recv() => {
            tracing::warn!("Interrupted while connecting, force exiting...");
            metrics::record_shutdown(ShutdownOutcome::Forced.label());
            return Ok(ShutdownOutcome::Forced);
        }
    }

    let agent = InviteAgent::new(client.clone(), close_signal);
    let mut agent_task = tokio::spawn(agent.run(events));

    let coordinator = ShutdownCoordinator::new(
        client,
        closed,
        Duration::from_millis(config.shutdown.timeout_ms),
    );

    let shutdown = coordinator.run(&mut interrupts);
    tokio::pin!(shutdown);
    let mut agent_running = true;

    loop {
        tokio::select! {
            outcome = &mut shutdown => return Ok(outcome),
            joined = &mut agent_task, if agent_running => {
                agent_running = false;
                let result = joined?;
                if coordinator.state() != ShutdownState::Running {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "Agent stopped during shutdown");
                    }
                    continue;
                }
                result?;
                tracing::warn!("Gateway connection lost for good, exiting");
                metrics::record_shutdown(ShutdownOutcome::ConnectionLost.label());
                return Ok(ShutdownOutcome::ConnectionLost);
            }
        }
    }
}

//! Shutdown coordination for the agent.
//!
//! # States
//! ```text
//! Running ──first interrupt──▶ ShuttingDown ──close confirmed / timeout──▶ Terminated (exit 0)
//!                                    │
//!                                    └──second interrupt──▶ Terminated (exit 1)
//! ```
//!
//! # Design Decisions
//! - Disconnect is fire-and-forget; only the close latch is awaited
//! - The wait is bounded by a fixed timeout
//! - State advances by compare-and-swap, so disconnect runs at most once
//! - The coordinator reports an outcome instead of exiting, the binary maps
//!   it to an exit code

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::gateway::Gateway;
use crate::lifecycle::signal::Awaitable;
use crate::observability::metrics;

/// Default bound on waiting for the gateway to confirm closure.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(5000);

const RUNNING: u8 = 0;
const SHUTTING_DOWN: u8 = 1;
const TERMINATED: u8 = 2;

/// Coordinator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ShuttingDown,
    Terminated,
}

impl From<u8> for ShutdownState {
    fn from(raw: u8) -> Self {
        match raw {
            RUNNING => ShutdownState::Running,
            SHUTTING_DOWN => ShutdownState::ShuttingDown,
            _ => ShutdownState::Terminated,
        }
    }
}

/// What a single interrupt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// First interrupt: disconnect requested, graceful wait begins.
    BeginGraceful,
    /// Interrupt during the graceful wait: exit now.
    ForceExit,
    /// Already terminated.
    Ignored,
}

/// How the shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The gateway confirmed the connection closed.
    Closed,
    /// The timeout elapsed first.
    TimedOut,
    /// A second interrupt cut the wait short, or an interrupt arrived
    /// before the gateway connected.
    Forced,
    /// Reconnection gave up while no shutdown was requested.
    ConnectionLost,
}

impl ShutdownOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            ShutdownOutcome::Closed | ShutdownOutcome::TimedOut | ShutdownOutcome::ConnectionLost => 0,
            ShutdownOutcome::Forced => 1,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            ShutdownOutcome::Closed => "closed",
            ShutdownOutcome::TimedOut => "timed_out",
            ShutdownOutcome::Forced => "forced",
            ShutdownOutcome::ConnectionLost => "connection_lost",
        }
    }
}

/// Turns interrupts into a bounded, orderly gateway shutdown.
pub struct ShutdownCoordinator<G> {
    gateway: G,
    closed: Awaitable<()>,
    timeout: Duration,
    state: AtomicU8,
}

impl<G: Gateway> ShutdownCoordinator<G> {
    /// Create a coordinator in the `Running` state.
    ///
    /// `closed` must resolve once the gateway reports the connection closed.
    pub fn new(gateway: G, closed: Awaitable<()>, timeout: Duration) -> Self {
        Self {
            gateway,
            closed,
            timeout,
            state: AtomicU8::new(RUNNING),
        }
    }

    /// Current state.
    pub fn state(&self) -> ShutdownState {
        self.state.load(Ordering::Acquire).into()
    }

    /// React to one interrupt.
    pub fn interrupt(&self) -> InterruptAction {
        if self
            .state
            .compare_exchange(RUNNING, SHUTTING_DOWN, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            tracing::info!("Gracefully shutting down...");
            self.gateway.disconnect();
            return InterruptAction::BeginGraceful;
        }

        if self
            .state
            .compare_exchange(SHUTTING_DOWN, TERMINATED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            tracing::warn!("Force exiting...");
            metrics::record_shutdown(ShutdownOutcome::Forced.label());
            return InterruptAction::ForceExit;
        }

        InterruptAction::Ignored
    }

    /// Wait for interrupts and drive the shutdown to an outcome.
    ///
    /// Never returns while no interrupt has arrived. If the interrupt source
    /// closes during the graceful wait, the wait simply runs to completion.
    pub async fn run<S>(&self, interrupts: &mut mpsc::UnboundedReceiver<S>) -> ShutdownOutcome {
        loop {
            match interrupts.recv().await {
                Some(_) => match self.interrupt() {
                    InterruptAction::BeginGraceful => break,
                    InterruptAction::ForceExit => return ShutdownOutcome::Forced,
                    InterruptAction::Ignored => {}
                },
                None => std::future::pending::<()>().await,
            }
        }

        tokio::select! {
            Some(_) = interrupts.recv() => {
                if self.interrupt() == InterruptAction::ForceExit {
                    return ShutdownOutcome::Forced;
                }
                self.wait_for_close().await
            }
            outcome = self.wait_for_close() => outcome,
        }
    }

    /// Race the close latch against the timeout, then terminate.
    async fn wait_for_close(&self) -> ShutdownOutcome {
        let outcome = tokio::select! {
            _ = self.closed.wait() => ShutdownOutcome::Closed,
            _ = tokio::time::sleep(self.timeout) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Gateway did not confirm close in time"
                );
                ShutdownOutcome::TimedOut
            }
        };

        self.state.store(TERMINATED, Ordering::Release);
        metrics::record_shutdown(outcome.label());
        tracing::info!("Process exited.");
        outcome
    }
}

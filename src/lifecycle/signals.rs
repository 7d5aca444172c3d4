//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGINT, plus SIGTERM on unix)
//! - Forward every delivery, in order, to the shutdown coordinator
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Signals are not interpreted here; a second delivery forcing exit is the
//!   coordinator's call

use tokio::sync::mpsc;

/// An OS signal that asks the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

/// Start listening for stop signals.
///
/// Handlers are registered before this returns, so a signal delivered right
/// afterwards is not lost.
#[cfg(unix)]
pub fn listen() -> std::io::Result<mpsc::UnboundedReceiver<StopSignal>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = sigint.recv() => StopSignal::Interrupt,
                Some(()) = sigterm.recv() => StopSignal::Terminate,
                else => break,
            };
            tracing::debug!(signal = ?received, "Stop signal received");
            if tx.send(received).is_err() {
                break;
            }
        }
    });

    Ok(rx)
}

/// Start listening for stop signals.
#[cfg(not(unix))]
pub fn listen() -> std::io::Result<mpsc::UnboundedReceiver<StopSignal>> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!(signal = ?StopSignal::Interrupt, "Stop signal received");
            if tx.send(StopSignal::Interrupt).is_err() {
                break;
            }
        }
    });

    Ok(rx)
}

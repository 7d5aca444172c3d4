//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Connect gateway → Spawn agent dispatch loop → Wait for interrupt
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → StopSignal channel → shutdown coordinator
//!
//! Shutdown (shutdown.rs):
//!     First signal → disconnect → race close latch (signal.rs) vs timeout → exit 0
//!     Second signal → exit 1
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown has timeout: the process never waits on the gateway forever
//! - Exit codes are decided by the shutdown outcome, not by callers

pub mod shutdown;
pub mod signal;
pub mod signals;
pub mod startup;

pub use shutdown::{ShutdownCoordinator, ShutdownOutcome, ShutdownState};
pub use startup::{run_agent, StartupError};

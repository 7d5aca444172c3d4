//! Gateway event handling.
//!
//! # Data Flow
//! ```text
//! GatewayEvent channel (FIFO)
//!     → handler.rs dispatch loop, one event at a time
//!         Connected    → log
//!         Disconnected → log → resolve close latch
//!         GroupInvite  → approve via gateway → log
//! ```
//!
//! # Design Decisions
//! - Always-approve policy; there is no other branch
//! - A failed approval ends the loop with an error, nothing is retried

pub mod handler;

pub use handler::{AgentError, InviteAgent};

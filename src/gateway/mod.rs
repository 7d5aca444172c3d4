//! Gateway integration subsystem.
//!
//! # Data Flow
//! ```text
//! NapCat websocket (OneBot v11 JSON frames)
//!     → client.rs (session loop, reconnection)
//!     → protocol.rs (decode events / action responses)
//!     → GatewayEvent channel (FIFO) → agent dispatch loop
//!
//! Agent / shutdown coordinator
//!     → Gateway trait (approve, disconnect)
//!     → client.rs (echo-correlated action frames)
//! ```
//!
//! # Constraints
//! - The access token is never logged
//! - Every action has a response deadline
//! - Reconnection uses a fixed delay and a bounded attempt count

pub mod client;
pub mod protocol;
pub mod types;

use std::future::Future;

pub use client::NapcatClient;
pub use types::{GatewayError, GatewayEvent, GatewayOptions, GatewayResult, GroupInviteRequest};

/// Operations the agent and the shutdown coordinator need from a gateway.
pub trait Gateway: Send + Sync + 'static {
    /// Begin closing the connection without waiting for it.
    ///
    /// Completion is reported as [`GatewayEvent::Disconnected`].
    fn disconnect(&self);

    /// Answer a group invite identified by its opaque `flag`.
    fn set_group_add_request(
        &self,
        flag: &str,
        approve: bool,
    ) -> impl Future<Output = GatewayResult<()>> + Send;
}

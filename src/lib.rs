//! NapCat group-invite agent library.
//!
//! Keeps a websocket connection to a NapCat (OneBot v11) gateway, approves
//! every group invite it sees and shuts down on SIGINT within a bounded time.

pub mod agent;
pub mod config;
pub mod gateway;
pub mod lifecycle;
pub mod observability;

pub use agent::InviteAgent;
pub use config::AgentConfig;
pub use gateway::{Gateway, NapcatClient};
pub use lifecycle::{run_agent, ShutdownCoordinator, ShutdownOutcome};

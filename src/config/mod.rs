//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config.json (or .toml)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//!     → split into gateway options and shutdown settings at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a new token or URL needs a restart
//! - Only the gateway URL is mandatory; everything else has a default
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AgentConfig;
pub use schema::ObservabilityConfig;
pub use schema::ReconnectionConfig;
pub use schema::ShutdownConfig;

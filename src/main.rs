//! NapCat Group-Invite Agent (v1)
//!
//! Connects to a NapCat websocket gateway and approves every group invite.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────┐
//!                    │                 INVITE AGENT                  │
//!                    │                                               │
//!   NapCat gateway   │  ┌──────────┐   events    ┌──────────────┐    │
//!   ◀════════════════┼─▶│ gateway  │────────────▶│    agent     │    │
//!     websocket      │  │  client  │◀────────────│  (approve)   │    │
//!                    │  └────▲─────┘   actions   └──────┬───────┘    │
//!                    │       │ disconnect               │ close latch│
//!                    │  ┌────┴──────────────────────────▼───────┐    │
//!   SIGINT/SIGTERM ──┼─▶│        lifecycle: shutdown            │    │
//!                    │  │  race close latch vs 5s timeout       │    │
//!                    │  └───────────────────────────────────────┘    │
//!                    └───────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use invite_agent::config::load_config;
use invite_agent::lifecycle::{run_agent, signals};
use invite_agent::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "invite-agent")]
#[command(about = "Auto-approves NapCat group invites", long_about = None)]
struct Cli {
    /// Path to the JSON (or .toml) configuration file.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log level, overriding the configuration file.
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    logging::init_logging(level);

    tracing::info!(
        gateway = %config.napcat_ws,
        reconnect = config.reconnection.enable,
        reconnect_attempts = config.reconnection.attempts,
        shutdown_timeout_ms = config.shutdown.timeout_ms,
        "invite-agent v0.1.0 starting"
    );

    if let Some(addr) = &config.observability.metrics_address {
        // Validation already checked the address parses.
        if let Ok(addr) = addr.parse() {
            metrics::init_metrics(addr);
        }
    }

    let interrupts = signals::listen()?;
    let outcome = run_agent(&config, interrupts).await?;

    std::process::exit(outcome.exit_code());
}

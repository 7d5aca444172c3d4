//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events on stdout)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Operator terminal / log aggregation
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;

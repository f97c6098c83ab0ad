//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Metrics are recorded through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Events carry node ids and rule ids as fields, never inside the message

pub mod logging;
pub mod metrics;

//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (active.rs)
//!     → fan out: probe.rs HealthProbe::check per node, each with a timeout
//!     → fan in: score.rs turns each report into a 0-100 score
//!     → one NodeRegistry::apply_health commit for the whole tick
//!     → history.rs keeps the last N results per node
//! ```
//!
//! # Design Decisions
//! - Probe failures and timeouts are data (score 0), never errors upward
//! - The monitor knows nothing about failover; it only rewrites node health
//! - A tick is atomic from the registry's point of view

pub mod active;
pub mod history;
pub mod probe;
pub mod score;

pub use active::HealthMonitor;
pub use history::{HealthCheckResult, HealthHistory};
pub use probe::{HealthProbe, HttpProbe, ProbeError, ProbeReport};
pub use score::{compute_health_score, ResourceMetrics};

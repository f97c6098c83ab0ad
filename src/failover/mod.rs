//! Failover subsystem.
//!
//! # Data Flow
//! ```text
//! Evaluation tick
//!     → rule engine match on the primary
//!     → coordinator.rs execute (in-flight guard)
//!         → select_target
//!         → cutover.rs drain within deadline
//!         → registry swap_roles
//!         → event log append
//!
//! Rollback check (same tick)
//!     → rollback.rs candidate (designated primary healthy + stable time elapsed)
//!     → coordinator.rs rollback (same in-flight guard)
//! ```
//!
//! # Design Decisions
//! - At most one role swap is pending; a second trigger is declined, not queued
//! - Failures become `failed` events; the registry is only touched on success

pub mod coordinator;
pub mod cutover;
pub mod rollback;

pub use coordinator::{FailoverCoordinator, FailoverOutcome, RejectReason};
pub use cutover::{Cutover, CutoverError, CutoverKind, CutoverPolicy, SettleCutover};
pub use rollback::{RollbackEvaluator, ROLLBACK_HEALTH_THRESHOLD};

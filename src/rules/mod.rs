//! Failover rules subsystem.
//!
//! # Data Flow
//! ```text
//! Config file / admin API
//!     → engine.rs (add, update, enable/disable, reload)
//!
//! Evaluation tick
//!     → current primary snapshot
//!     → engine.rs walks enabled rules by ascending priority
//!     → first rule whose thresholds the primary crosses (rule.rs)
//! ```
//!
//! # Design Decisions
//! - First match wins; matching rules are never combined
//! - Any single threshold is enough to fire a rule
//! - Rules are read-only during evaluation

pub mod engine;
pub mod rule;

pub use engine::{RuleEngine, RuleError, RuleMatch};
pub use rule::{FailoverRule, FailoverStrategy, RollbackPolicy, TriggerCause, TriggerThresholds};

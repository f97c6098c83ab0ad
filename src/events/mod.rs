//! Failover audit trail.
//!
//! # Data Flow
//! ```text
//! Coordinator / rollback evaluator
//!     → event.rs (build FailoverEvent)
//!     → log.rs EventLog::append (log + metric + store)
//!
//! Readers
//!     → recent(n), all(), last_completed_failover(), stats()
//! ```
//!
//! # Design Decisions
//! - Append-only: corrections are new events, never edits
//! - Timestamp order is the canonical audit order

pub mod event;
pub mod log;

pub use event::{EventType, FailoverEvent};
pub use log::{EventLog, EventRepository, EventStats, InMemoryEventRepository};

//! Node health monitoring and failover coordination.

pub mod admin;
pub mod config;
pub mod events;
pub mod failover;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod rules;
pub mod service;

#[cfg(test)]
mod testing;

pub use config::ArbiterConfig;
pub use lifecycle::Shutdown;
pub use service::{FailoverService, FailoverStatus};

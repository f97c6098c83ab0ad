//! Cutover windows.
//!
//! A cutover is the drain/settle period between deciding on a new primary
//! and swapping roles. Immediate, graceful and rollback cutovers differ only
//! in how long they may take; each is bounded by a deadline.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StrategyConfig;
use crate::registry::Node;
use crate::rules::FailoverStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoverKind {
    Immediate,
    Graceful,
    Rollback,
}

impl CutoverKind {
    /// Kind used for a rule's strategy. Manual-only rules have none.
    pub fn for_strategy(strategy: FailoverStrategy) -> Option<Self> {
        match strategy {
            FailoverStrategy::Immediate => Some(CutoverKind::Immediate),
            FailoverStrategy::Graceful => Some(CutoverKind::Graceful),
            FailoverStrategy::ManualOnly => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CutoverKind::Immediate => "immediate",
            CutoverKind::Graceful => "graceful",
            CutoverKind::Rollback => "rollback",
        }
    }
}

#[derive(Debug, Error)]
pub enum CutoverError {
    #[error("cutover exceeded its deadline of {0} ms")]
    DeadlineExceeded(u64),

    #[error("cutover aborted: {0}")]
    Aborted(String),
}

/// Window lengths per cutover kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutoverPolicy {
    pub immediate_window: Duration,
    pub graceful_window: Duration,
    pub rollback_window: Duration,
    /// Slack allowed on top of a window before the cutover is abandoned.
    pub grace: Duration,
}

impl CutoverPolicy {
    pub fn window(&self, kind: CutoverKind) -> Duration {
        match kind {
            CutoverKind::Immediate => self.immediate_window,
            CutoverKind::Graceful => self.graceful_window,
            CutoverKind::Rollback => self.rollback_window,
        }
    }

    pub fn deadline(&self, kind: CutoverKind) -> Duration {
        self.window(kind) + self.grace
    }
}

/// Zero-length windows with one second of grace.
impl Default for CutoverPolicy {
    fn default() -> Self {
        Self {
            immediate_window: Duration::ZERO,
            graceful_window: Duration::ZERO,
            rollback_window: Duration::ZERO,
            grace: Duration::from_secs(1),
        }
    }
}

impl From<&StrategyConfig> for CutoverPolicy {
    fn from(config: &StrategyConfig) -> Self {
        Self {
            immediate_window: Duration::from_secs(config.immediate_window_secs),
            graceful_window: Duration::from_secs(config.graceful_window_secs),
            rollback_window: Duration::from_secs(config.rollback_window_secs),
            grace: Duration::from_secs(config.cutover_grace_secs),
        }
    }
}

/// Performs the drain between the old and the new primary.
#[async_trait]
pub trait Cutover: Send + Sync {
    async fn drain(&self, from: &Node, to: &Node, window: Duration) -> Result<(), CutoverError>;
}

/// Waits out the window so in-flight work on the old primary can settle.
#[derive(Debug, Default, Clone, Copy)]
pub struct SettleCutover;

#[async_trait]
impl Cutover for SettleCutover {
    async fn drain(&self, from: &Node, to: &Node, window: Duration) -> Result<(), CutoverError> {
        tracing::debug!(from = %from.id, to = %to.id, window_ms = window.as_millis() as u64, "Draining");
        tokio::time::sleep(window).await;
        Ok(())
    }
}

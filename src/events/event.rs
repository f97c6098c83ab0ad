//! Failover event records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Triggered,
    Completed,
    RolledBack,
    Failed,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Triggered => "triggered",
            EventType::Completed => "completed",
            EventType::RolledBack => "rolled_back",
            EventType::Failed => "failed",
        }
    }
}

/// One failover or rollback attempt. Never edited after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub source_node_id: NodeId,
    /// Absent when no target could be selected.
    pub target_node_id: Option<NodeId>,
    /// Rule that triggered the attempt; absent for manual requests and rollbacks.
    pub rule_id: Option<String>,
    pub reason: String,
    pub duration_ms: u64,
    pub downtime_ms: u64,
    pub data_loss_percent: f64,
    pub success: bool,
}

impl FailoverEvent {
    pub fn new(event_type: EventType, source: NodeId, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            source_node_id: source,
            target_node_id: None,
            rule_id: None,
            reason: reason.into(),
            duration_ms: 0,
            downtime_ms: 0,
            data_loss_percent: 0.0,
            success: matches!(event_type, EventType::Completed | EventType::RolledBack),
        }
    }

    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target_node_id = Some(target);
        self
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn with_timing(mut self, duration: Duration, downtime: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self.downtime_ms = downtime.as_millis() as u64;
        self
    }
}

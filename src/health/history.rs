//! Per-node health check history.

use std::collections::VecDeque;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::health::score::ResourceMetrics;
use crate::registry::NodeId;

/// Outcome of one health check. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub node_id: NodeId,
    pub timestamp: DateTime<Utc>,
    pub response_time_ms: u64,
    /// HTTP status of the check, absent when no response arrived.
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub health_score: u8,
    pub metrics: ResourceMetrics,
}

impl HealthCheckResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Bounded ring buffer of results per node.
#[derive(Debug)]
pub struct HealthHistory {
    limit: usize,
    entries: DashMap<NodeId, VecDeque<HealthCheckResult>>,
}

impl HealthHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            entries: DashMap::new(),
        }
    }

    /// Append a result, evicting the oldest once the node's buffer is full.
    pub fn record(&self, result: HealthCheckResult) {
        let mut buffer = self.entries.entry(result.node_id.clone()).or_default();
        if buffer.len() >= self.limit {
            buffer.pop_front();
        }
        buffer.push_back(result);
    }

    /// Results for `node` no older than `window_hours` before `now`, oldest first.
    ///
    /// A window reaching past the representable date range returns the whole buffer.
    pub fn window(&self, node: &NodeId, window_hours: u32, now: DateTime<Utc>) -> Vec<HealthCheckResult> {
        let cutoff = ChronoDuration::try_hours(i64::from(window_hours))
            .and_then(|span| now.checked_sub_signed(span));
        self.entries
            .get(node)
            .map(|buffer| {
                buffer
                    .iter()
                    .filter(|r| cutoff.map_or(true, |cutoff| r.timestamp >= cutoff))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn latest(&self, node: &NodeId) -> Option<HealthCheckResult> {
        self.entries.get(node).and_then(|buffer| buffer.back().cloned())
    }

    pub fn len(&self, node: &NodeId) -> usize {
        self.entries.get(node).map(|buffer| buffer.len()).unwrap_or(0)
    }

    /// Drop the history of a node that left the registry.
    pub fn forget(&self, node: &NodeId) {
        self.entries.remove(node);
    }
}

//! Node model.
//!
//! # Responsibilities
//! - Represent a single member of the monitored fleet
//! - Carry the live attributes rewritten by every monitor tick
//! - Answer eligibility questions used by target selection

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::NodeConfig;

/// Stable node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Role a node currently plays in the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Primary,
    Secondary,
    Tertiary,
}

/// Operational status derived from the health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Active,
    Inactive,
    Maintenance,
    Failed,
}

/// Replication state of a node relative to the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSyncStatus {
    #[default]
    Synced,
    Syncing,
    OutOfSync,
}

/// A monitored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub address: String,
    pub region: String,
    pub role: NodeRole,
    /// Lower is preferred as a failover candidate.
    pub priority: u32,
    pub status: NodeStatus,
    /// Composite score in `0..=100`.
    pub health_score: u8,
    pub response_time_ms: u64,
    pub uptime_percent: f64,
    /// Fraction of capacity in use, `0.0..=1.0`.
    pub load: f64,
    pub capabilities: BTreeSet<String>,
    pub data_sync_status: DataSyncStatus,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub last_health_check: Option<DateTime<Utc>>,
    /// Successive checks scoring below the failure threshold.
    pub consecutive_failures: u32,
}

impl Node {
    pub fn is_primary(&self) -> bool {
        self.role == NodeRole::Primary
    }

    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }

    /// A node may receive primary traffic only when active and fully synced.
    pub fn is_failover_eligible(&self) -> bool {
        self.is_active() && self.data_sync_status == DataSyncStatus::Synced
    }
}

impl From<NodeConfig> for Node {
    fn from(config: NodeConfig) -> Self {
        let now = Utc::now();
        let id = config.node_id();
        Self {
            id,
            name: config.name,
            address: config.address,
            region: config.region,
            role: config.role,
            priority: config.priority,
            status: NodeStatus::Active,
            health_score: 100,
            response_time_ms: 0,
            uptime_percent: config.uptime_percent,
            load: 0.0,
            capabilities: config.capabilities.into_iter().collect(),
            data_sync_status: config.data_sync_status,
            last_sync_time: (config.data_sync_status == DataSyncStatus::Synced).then_some(now),
            last_health_check: None,
            consecutive_failures: 0,
        }
    }
}

/// Optional criteria for listing nodes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeFilter {
    pub role: Option<NodeRole>,
    pub status: Option<NodeStatus>,
    pub min_health_score: Option<u8>,
}

impl NodeFilter {
    pub fn matches(&self, node: &Node) -> bool {
        self.role.map_or(true, |role| node.role == role)
            && self.status.map_or(true, |status| node.status == status)
            && self.min_health_score.map_or(true, |min| node.health_score >= min)
    }
}

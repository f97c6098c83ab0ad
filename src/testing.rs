//! Fixtures shared by unit tests.

use std::collections::BTreeSet;

use crate::registry::{DataSyncStatus, Node, NodeId, NodeRole, NodeStatus};

/// A healthy, synced node.
pub fn node(id: &str, role: NodeRole, priority: u32) -> Node {
    Node {
        id: NodeId::from(id),
        name: id.to_string(),
        address: "127.0.0.1:9000".to_string(),
        region: "local".to_string(),
        role,
        priority,
        status: NodeStatus::Active,
        health_score: 90,
        response_time_ms: 40,
        uptime_percent: 99.9,
        load: 0.2,
        capabilities: BTreeSet::new(),
        data_sync_status: DataSyncStatus::Synced,
        last_sync_time: None,
        last_health_check: None,
        consecutive_failures: 0,
    }
}

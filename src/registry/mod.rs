//! Node registry subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap config / admin API
//!     → add_node (duplicate + single-primary checks)
//!
//! Health monitor tick
//!     → apply_health (one commit per tick)
//!
//! Failover coordinator
//!     → swap_roles (the only writer of `role`)
//!
//! Readers (rule engine, dashboards)
//!     → snapshot / list_nodes / current_primary
//! ```
//!
//! # Design Decisions
//! - Writers are serialized by a single commit lock; readers never block
//! - Each commit publishes a whole new node set (no partial-tick views)
//! - Storage sits behind `NodeRepository` so a persistent store can be swapped in

pub mod node;
pub mod store;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::health::score;

pub use node::{DataSyncStatus, Node, NodeFilter, NodeId, NodeRole, NodeStatus};
pub use store::{InMemoryNodeRepository, NodeRepository, NodeSet};

/// Errors raised by registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("node already registered: {0}")]
    DuplicateNode(NodeId),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// The outcome of one health check, ready to be folded into a node.
#[derive(Debug, Clone)]
pub struct HealthUpdate {
    pub node_id: NodeId,
    pub health_score: u8,
    pub response_time_ms: u64,
    /// `None` keeps the previous load (failed probes report nothing).
    pub load: Option<f64>,
    /// `None` keeps the previous uptime figure.
    pub uptime_percent: Option<f64>,
    pub checked_at: DateTime<Utc>,
}

impl HealthUpdate {
    fn apply_to(&self, node: &mut Node) {
        node.health_score = self.health_score.min(100);
        node.response_time_ms = self.response_time_ms;
        node.last_health_check = Some(self.checked_at);
        if let Some(load) = self.load {
            node.load = load.clamp(0.0, 1.0);
        }
        if let Some(uptime) = self.uptime_percent {
            node.uptime_percent = uptime;
        }

        // Operators own the maintenance flag.
        if node.status != NodeStatus::Maintenance {
            node.status = score::status_for_score(node.health_score);
        }

        if score::is_failing(node.health_score) {
            node.consecutive_failures = node.consecutive_failures.saturating_add(1);
        } else {
            node.consecutive_failures = 0;
        }
    }
}

/// Registry of known nodes.
pub struct NodeRegistry {
    repo: Arc<dyn NodeRepository>,
    writer: Mutex<()>,
}

impl NodeRegistry {
    /// Create a registry backed by an in-memory repository.
    pub fn new() -> Self {
        Self::with_repository(Arc::new(InMemoryNodeRepository::new()))
    }

    /// Create a registry over a custom repository.
    pub fn with_repository(repo: Arc<dyn NodeRepository>) -> Self {
        Self {
            repo,
            writer: Mutex::new(()),
        }
    }

    /// Run `f` against a copy of the node set and publish it if `f` succeeds.
    fn commit<T>(
        &self,
        f: impl FnOnce(&mut NodeSet) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = NodeSet::clone(&self.repo.snapshot());
        let out = f(&mut next)?;
        self.repo.publish(next);
        Ok(out)
    }

    /// Current published node set.
    pub fn snapshot(&self) -> Arc<NodeSet> {
        self.repo.snapshot()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Register a node. A second primary is refused.
    pub fn add_node(&self, node: Node) -> Result<NodeId, RegistryError> {
        self.commit(|nodes| {
            if nodes.contains_key(&node.id) {
                return Err(RegistryError::DuplicateNode(node.id.clone()));
            }
            if node.is_primary() {
                if let Some(existing) = nodes.values().find(|n| n.is_primary()) {
                    return Err(RegistryError::InvariantViolation(format!(
                        "{} is already primary",
                        existing.id
                    )));
                }
            }
            let id = node.id.clone();
            tracing::info!(node = %id, role = ?node.role, priority = node.priority, "Node registered");
            nodes.insert(id.clone(), node);
            Ok(id)
        })
    }

    /// Remove a node. The current primary cannot be removed.
    pub fn remove_node(&self, id: &NodeId) -> Result<Node, RegistryError> {
        self.commit(|nodes| {
            let node = nodes
                .get(id)
                .ok_or_else(|| RegistryError::UnknownNode(id.clone()))?;
            if node.is_primary() {
                return Err(RegistryError::InvariantViolation(format!(
                    "cannot remove current primary {}",
                    id
                )));
            }
            tracing::info!(node = %id, "Node removed");
            nodes
                .remove(id)
                .ok_or_else(|| RegistryError::UnknownNode(id.clone()))
        })
    }

    pub fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.snapshot().get(id).cloned()
    }

    /// Nodes matching `filter`, ordered by priority then id.
    pub fn list_nodes(&self, filter: &NodeFilter) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .snapshot()
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        nodes
    }

    pub fn current_primary(&self) -> Option<Node> {
        self.snapshot().values().find(|n| n.is_primary()).cloned()
    }

    /// Demote `from` to secondary and promote `to` to primary in one commit.
    pub fn swap_roles(&self, from: &NodeId, to: &NodeId) -> Result<(), RegistryError> {
        self.commit(|nodes| {
            let source = nodes
                .get(from)
                .ok_or_else(|| RegistryError::UnknownNode(from.clone()))?;
            if !source.is_primary() {
                return Err(RegistryError::InvariantViolation(format!(
                    "{} is not the current primary",
                    from
                )));
            }
            if from == to {
                return Err(RegistryError::InvariantViolation(format!(
                    "{} is already the primary",
                    to
                )));
            }
            let target = nodes
                .get(to)
                .ok_or_else(|| RegistryError::UnknownNode(to.clone()))?;
            if !target.is_failover_eligible() {
                return Err(RegistryError::InvariantViolation(format!(
                    "{} is not eligible for promotion (status {:?}, sync {:?})",
                    to, target.status, target.data_sync_status
                )));
            }

            if let Some(source) = nodes.get_mut(from) {
                source.role = NodeRole::Secondary;
            }
            if let Some(target) = nodes.get_mut(to) {
                target.role = NodeRole::Primary;
            }
            tracing::info!(from = %from, to = %to, "Primary role swapped");
            Ok(())
        })
    }

    /// Fold one monitor tick into the registry. Unknown nodes are skipped.
    pub fn apply_health(&self, updates: &[HealthUpdate]) -> usize {
        let applied = self.commit(|nodes| {
            let mut applied = 0;
            for update in updates {
                if let Some(node) = nodes.get_mut(&update.node_id) {
                    update.apply_to(node);
                    applied += 1;
                }
            }
            Ok(applied)
        });
        applied.unwrap_or(0)
    }

    /// Record a replication status change reported by the data layer.
    pub fn set_sync_status(&self, id: &NodeId, status: DataSyncStatus) -> Result<(), RegistryError> {
        self.commit(|nodes| {
            let node = nodes
                .get_mut(id)
                .ok_or_else(|| RegistryError::UnknownNode(id.clone()))?;
            node.data_sync_status = status;
            if status == DataSyncStatus::Synced {
                node.last_sync_time = Some(Utc::now());
            }
            Ok(())
        })
    }

    /// Put a node into or take it out of maintenance.
    pub fn set_maintenance(&self, id: &NodeId, enabled: bool) -> Result<(), RegistryError> {
        self.commit(|nodes| {
            let node = nodes
                .get_mut(id)
                .ok_or_else(|| RegistryError::UnknownNode(id.clone()))?;
            node.status = if enabled {
                NodeStatus::Maintenance
            } else {
                score::status_for_score(node.health_score)
            };
            tracing::info!(node = %id, maintenance = enabled, "Maintenance mode changed");
            Ok(())
        })
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.len())
            .finish()
    }
}

//! Node storage.
//!
//! The registry never mutates a published node set in place. Every commit
//! builds the next set and publishes it whole, so readers always observe
//! the state left by the last completed write.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::registry::node::{Node, NodeId};

/// The full set of known nodes keyed by id.
pub type NodeSet = BTreeMap<NodeId, Node>;

/// Backing store for the node registry.
pub trait NodeRepository: Send + Sync {
    /// Current published node set.
    fn snapshot(&self) -> Arc<NodeSet>;

    /// Replace the published node set.
    fn publish(&self, nodes: NodeSet);
}

/// Lock-free in-memory repository built on `ArcSwap`.
#[derive(Debug)]
pub struct InMemoryNodeRepository {
    current: ArcSwap<NodeSet>,
}

impl InMemoryNodeRepository {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(NodeSet::new()),
        }
    }
}

impl Default for InMemoryNodeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRepository for InMemoryNodeRepository {
    fn snapshot(&self) -> Arc<NodeSet> {
        self.current.load_full()
    }

    fn publish(&self, nodes: NodeSet) {
        self.current.store(Arc::new(nodes));
    }
}

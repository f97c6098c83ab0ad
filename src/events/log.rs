//! Append-only event ledger.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::events::event::{EventType, FailoverEvent};
use crate::observability::metrics;

/// Backing store for failover events. There is deliberately no edit or delete.
pub trait EventRepository: Send + Sync {
    fn append(&self, event: FailoverEvent);

    /// Every event, in append order.
    fn all(&self) -> Vec<FailoverEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: RwLock<Vec<FailoverEvent>>,
}

impl EventRepository for InMemoryEventRepository {
    fn append(&self, event: FailoverEvent) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn all(&self) -> Vec<FailoverEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Aggregates shown on the status view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventStats {
    pub total: usize,
    pub successful: usize,
    pub last_failover_time: Option<DateTime<Utc>>,
    pub average_failover_duration_ms: f64,
}

pub struct EventLog {
    repo: Arc<dyn EventRepository>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_repository(Arc::new(InMemoryEventRepository::default()))
    }

    pub fn with_repository(repo: Arc<dyn EventRepository>) -> Self {
        Self { repo }
    }

    pub fn append(&self, event: FailoverEvent) -> FailoverEvent {
        tracing::info!(
            event_id = %event.id,
            event_type = event.event_type.as_str(),
            source = %event.source_node_id,
            target = ?event.target_node_id.as_ref().map(|t| t.to_string()),
            success = event.success,
            reason = %event.reason,
            "Failover event recorded"
        );
        metrics::record_failover_event(event.event_type.as_str(), event.success);
        self.repo.append(event.clone());
        event
    }

    /// Every event in timestamp order.
    pub fn all(&self) -> Vec<FailoverEvent> {
        let mut events = self.repo.all();
        events.sort_by_key(|e| e.timestamp);
        events
    }

    /// Up to `n` events, newest first.
    pub fn recent(&self, n: usize) -> Vec<FailoverEvent> {
        let mut events = self.all();
        events.reverse();
        events.truncate(n);
        events
    }

    pub fn len(&self) -> usize {
        self.repo.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Latest `completed` event.
    pub fn last_completed_failover(&self) -> Option<FailoverEvent> {
        self.all()
            .into_iter()
            .rev()
            .find(|e| e.event_type == EventType::Completed)
    }

    /// The most recent event of any type.
    pub fn last(&self) -> Option<FailoverEvent> {
        self.all().pop()
    }

    pub fn stats(&self) -> EventStats {
        let events = self.all();
        let completed: Vec<&FailoverEvent> = events
            .iter()
            .filter(|e| e.event_type == EventType::Completed && e.success)
            .collect();
        let average = if completed.is_empty() {
            0.0
        } else {
            completed.iter().map(|e| e.duration_ms as f64).sum::<f64>() / completed.len() as f64
        };

        EventStats {
            total: events.len(),
            successful: events.iter().filter(|e| e.success).count(),
            last_failover_time: completed.last().map(|e| e.timestamp),
            average_failover_duration_ms: average,
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

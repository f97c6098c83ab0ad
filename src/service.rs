//! The arbiter as one explicit object.
//!
//! # Data Flow
//! ```text
//! monitor loop    → HealthMonitor::tick → registry + history
//! evaluation loop → evaluate (rules → coordinator) → rollback_tick
//! admin API       → the query and command methods below
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::{ArbiterConfig, NodeConfig};
use crate::events::{EventLog, EventType, FailoverEvent};
use crate::failover::{
    Cutover, CutoverPolicy, FailoverCoordinator, FailoverOutcome, RollbackEvaluator, SettleCutover,
};
use crate::health::{HealthCheckResult, HealthHistory, HealthMonitor, HealthProbe};
use crate::lifecycle::Shutdown;
use crate::registry::{DataSyncStatus, Node, NodeFilter, NodeId, NodeRegistry, RegistryError};
use crate::rules::{FailoverRule, FailoverStrategy, RuleEngine, RuleError, RuleMatch};

/// Score above which a node counts as healthy on the status view.
pub const HEALTHY_SCORE_THRESHOLD: u8 = 70;

/// Snapshot of the failover state for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailoverStatus {
    /// Id of the primary rather than its display name; look the node up for the name.
    pub current_primary: Option<NodeId>,
    pub total_nodes: usize,
    pub active_nodes: usize,
    pub healthy_nodes: usize,
    pub in_flight: bool,
    pub last_failover_time: Option<DateTime<Utc>>,
    pub total_failovers: usize,
    pub successful_failovers: usize,
    pub average_failover_duration_ms: f64,
    /// Manual-only rule currently waiting for an operator.
    pub awaiting_operator: Option<String>,
}

pub struct FailoverService {
    registry: Arc<NodeRegistry>,
    history: Arc<HealthHistory>,
    events: Arc<EventLog>,
    rules: Arc<RuleEngine>,
    coordinator: Arc<FailoverCoordinator>,
    monitor: HealthMonitor,
    rollback: RollbackEvaluator,
    /// (primary, rule) of the manual-only episode already recorded.
    awaiting_operator: Mutex<Option<(NodeId, String)>>,
    evaluation_interval: Duration,
}

impl FailoverService {
    /// Build a service with the settle cutover and register the bootstrap nodes.
    pub fn new(config: &ArbiterConfig, probe: Arc<dyn HealthProbe>) -> Result<Self, RegistryError> {
        Self::with_cutover(config, probe, Arc::new(SettleCutover))
    }

    pub fn with_cutover(
        config: &ArbiterConfig,
        probe: Arc<dyn HealthProbe>,
        cutover: Arc<dyn Cutover>,
    ) -> Result<Self, RegistryError> {
        let registry = Arc::new(NodeRegistry::new());
        let history = Arc::new(HealthHistory::new(config.monitor.history_limit));
        let events = Arc::new(EventLog::new());
        let rules = Arc::new(RuleEngine::new(config.rules.clone()));
        let coordinator = Arc::new(FailoverCoordinator::new(
            registry.clone(),
            events.clone(),
            cutover,
            CutoverPolicy::from(&config.strategy),
        ));
        let monitor = HealthMonitor::new(
            registry.clone(),
            probe,
            history.clone(),
            config.monitor.clone(),
        );
        let rollback = RollbackEvaluator::new(
            registry.clone(),
            events.clone(),
            rules.clone(),
            coordinator.clone(),
            Duration::from_secs(config.strategy.default_min_stable_secs),
        );

        let service = Self {
            registry,
            history,
            events,
            rules,
            coordinator,
            monitor,
            rollback,
            awaiting_operator: Mutex::new(None),
            evaluation_interval: Duration::from_secs(config.evaluation.interval_secs.max(1)),
        };

        for node in &config.nodes {
            service.register_node(Node::from(node.clone()))?;
        }
        tracing::info!(
            nodes = service.registry.len(),
            rules = service.rules.rules().len(),
            "Failover service initialized"
        );
        Ok(service)
    }

    // ---- nodes ----

    pub fn register_node(&self, node: Node) -> Result<NodeId, RegistryError> {
        self.registry.add_node(node)
    }

    /// Register a node described the same way as in the config file.
    pub fn register_node_config(&self, config: NodeConfig) -> Result<NodeId, RegistryError> {
        self.register_node(Node::from(config))
    }

    pub fn remove_node(&self, id: &NodeId) -> Result<Node, RegistryError> {
        let node = self.registry.remove_node(id)?;
        self.history.forget(id);
        Ok(node)
    }

    pub fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.registry.get_node(id)
    }

    pub fn list_nodes(&self, filter: &NodeFilter) -> Vec<Node> {
        self.registry.list_nodes(filter)
    }

    pub fn current_primary(&self) -> Option<Node> {
        self.registry.current_primary()
    }

    pub fn set_sync_status(&self, id: &NodeId, status: DataSyncStatus) -> Result<(), RegistryError> {
        self.registry.set_sync_status(id, status)
    }

    pub fn set_maintenance(&self, id: &NodeId, enabled: bool) -> Result<(), RegistryError> {
        self.registry.set_maintenance(id, enabled)
    }

    // ---- queries ----

    pub fn failover_status(&self) -> FailoverStatus {
        let snapshot = self.registry.snapshot();
        let stats = self.events.stats();
        let awaiting = self
            .awaiting_operator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, rule)| rule.clone());

        FailoverStatus {
            current_primary: snapshot.values().find(|n| n.is_primary()).map(|n| n.id.clone()),
            total_nodes: snapshot.len(),
            active_nodes: snapshot.values().filter(|n| n.is_active()).count(),
            healthy_nodes: snapshot
                .values()
                .filter(|n| n.health_score > HEALTHY_SCORE_THRESHOLD)
                .count(),
            in_flight: self.coordinator.is_in_flight(),
            last_failover_time: stats.last_failover_time,
            total_failovers: stats.total,
            successful_failovers: stats.successful,
            average_failover_duration_ms: stats.average_failover_duration_ms,
            awaiting_operator: awaiting,
        }
    }

    /// Check results for `id` from the last `window_hours`, oldest first.
    pub fn node_health_history(&self, id: &NodeId, window_hours: u32) -> Vec<HealthCheckResult> {
        self.history.window(id, window_hours, Utc::now())
    }

    /// Up to `limit` events, newest first.
    pub fn failover_events(&self, limit: usize) -> Vec<FailoverEvent> {
        self.events.recent(limit)
    }

    // ---- commands ----

    /// Promote `target`. False when declined or when the cutover failed.
    pub async fn manual_failover(&self, target: &NodeId) -> bool {
        self.request_failover(target).await.is_completed()
    }

    /// Promote `target`, reporting why a request did not complete.
    pub async fn request_failover(&self, target: &NodeId) -> FailoverOutcome {
        let outcome = self.coordinator.manual_failover(target).await;
        if outcome.is_completed() {
            self.clear_awaiting_operator();
        }
        outcome
    }

    pub fn rules(&self) -> Vec<FailoverRule> {
        self.rules.rules()
    }

    pub fn add_rule(&self, rule: FailoverRule) -> Result<(), RuleError> {
        self.rules.add_rule(rule)
    }

    pub fn update_rule(&self, rule: FailoverRule) -> Result<(), RuleError> {
        self.rules.update_rule(rule)
    }

    pub fn set_rule_enabled(&self, id: &str, enabled: bool) -> Result<(), RuleError> {
        self.rules.set_enabled(id, enabled)
    }

    pub fn remove_rule(&self, id: &str) -> Result<FailoverRule, RuleError> {
        self.rules.remove_rule(id)
    }

    /// Replace the whole rule set, e.g. after the config file changed.
    pub fn reload_rules(&self, rules: Vec<FailoverRule>) -> Result<(), RuleError> {
        tracing::info!(count = rules.len(), "Reloading failover rules");
        self.rules.replace_all(rules)
    }

    // ---- ticks ----

    pub async fn monitor_tick(&self) -> Vec<HealthCheckResult> {
        self.monitor.tick().await
    }

    /// Evaluate the rules against the primary and fail over if one matches.
    pub async fn evaluate(&self) -> Option<FailoverOutcome> {
        let primary = self.registry.current_primary()?;
        let Some(RuleMatch { rule, cause }) = self.rules.evaluate(&primary) else {
            self.clear_awaiting_operator();
            return None;
        };

        if rule.strategy == FailoverStrategy::ManualOnly {
            self.await_operator(&primary, &rule, &cause.to_string());
            return None;
        }

        tracing::warn!(
            primary = %primary.id,
            rule = %rule.id,
            cause = %cause,
            "Failover rule matched"
        );
        let outcome = self.coordinator.execute(&primary, &rule).await;
        if outcome.is_completed() {
            self.clear_awaiting_operator();
        }
        Some(outcome)
    }

    pub async fn rollback_tick(&self) -> Option<FailoverOutcome> {
        self.rollback.tick().await
    }

    /// Rollback check as of `now`.
    pub async fn rollback_tick_at(&self, now: DateTime<Utc>) -> Option<FailoverOutcome> {
        self.rollback.tick_at(now).await
    }

    /// One pass of the evaluation loop.
    pub async fn evaluation_tick(&self) {
        if let Some(outcome) = self.evaluate().await {
            tracing::debug!(?outcome, "Evaluation produced a failover outcome");
        }
        if let Some(outcome) = self.rollback_tick().await {
            tracing::debug!(?outcome, "Rollback check produced an outcome");
        }
    }

    /// Record one `triggered` event per manual-only episode.
    fn await_operator(&self, primary: &Node, rule: &FailoverRule, cause: &str) {
        let mut awaiting = self
            .awaiting_operator
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let key = (primary.id.clone(), rule.id.clone());
        if awaiting.as_ref() == Some(&key) {
            return;
        }

        tracing::warn!(
            primary = %primary.id,
            rule = %rule.id,
            cause = %cause,
            "Manual-only rule matched, awaiting operator"
        );
        let event = FailoverEvent::new(
            EventType::Triggered,
            primary.id.clone(),
            format!("{}: {}; awaiting operator", rule.name, cause),
        )
        .with_rule(&rule.id);
        self.events.append(event);
        *awaiting = Some(key);
    }

    fn clear_awaiting_operator(&self) {
        self.awaiting_operator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    // ---- loops ----

    /// Spawn the monitor and evaluation loops. Both exit on shutdown.
    pub fn spawn(self: &Arc<Self>, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        let monitor = {
            let service = Arc::clone(self);
            let rx = shutdown.subscribe();
            let stopped = shutdown.is_triggered();
            tokio::spawn(async move {
                if !stopped {
                    service.monitor.run(rx).await;
                }
            })
        };

        let evaluation = {
            let service = Arc::clone(self);
            let mut rx = shutdown.subscribe();
            let stopped = shutdown.is_triggered();
            tokio::spawn(async move {
                if stopped {
                    return;
                }
                tracing::info!(
                    interval_secs = service.evaluation_interval.as_secs(),
                    "Failover evaluation starting"
                );
                let mut ticker = time::interval(service.evaluation_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        biased;
                        _ = rx.recv() => {
                            tracing::info!("Failover evaluation received shutdown signal, exiting loop");
                            break;
                        }
                        _ = ticker.tick() => {
                            service.evaluation_tick().await;
                        }
                    }
                }
            })
        };

        vec![monitor, evaluation]
    }
}

impl std::fmt::Debug for FailoverService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverService")
            .field("registry", &self.registry)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

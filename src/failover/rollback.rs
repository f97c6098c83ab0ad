//! Return of the primary role to the designated primary once it has recovered.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::events::EventLog;
use crate::failover::coordinator::{FailoverCoordinator, FailoverOutcome};
use crate::registry::{Node, NodeRegistry, NodeRole, NodeStatus};
use crate::rules::{RollbackPolicy, RuleEngine};

/// Score the original primary must exceed before it gets the role back.
pub const ROLLBACK_HEALTH_THRESHOLD: u8 = 80;

/// Priority that marks the designated primary.
const DESIGNATED_PRIORITY: u32 = 1;

pub struct RollbackEvaluator {
    registry: Arc<NodeRegistry>,
    events: Arc<EventLog>,
    rules: Arc<RuleEngine>,
    coordinator: Arc<FailoverCoordinator>,
    default_min_stable: Duration,
}

impl RollbackEvaluator {
    pub fn new(
        registry: Arc<NodeRegistry>,
        events: Arc<EventLog>,
        rules: Arc<RuleEngine>,
        coordinator: Arc<FailoverCoordinator>,
        default_min_stable: Duration,
    ) -> Self {
        Self {
            registry,
            events,
            rules,
            coordinator,
            default_min_stable,
        }
    }

    pub async fn tick(&self) -> Option<FailoverOutcome> {
        self.tick_at(Utc::now()).await
    }

    /// Run one rollback check as of `now`.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Option<FailoverOutcome> {
        if self.coordinator.is_in_flight() {
            return None;
        }
        let original = self.candidate(now)?;
        tracing::info!(node = %original.id, score = original.health_score, "Designated primary recovered");
        Some(self.coordinator.rollback(&original.id).await)
    }

    /// The designated primary, if it should be handed the role back at `now`.
    pub fn candidate(&self, now: DateTime<Utc>) -> Option<Node> {
        let last = self.events.last_completed_failover()?;

        let original = self
            .registry
            .snapshot()
            .values()
            .find(|n| n.role == NodeRole::Secondary && n.priority == DESIGNATED_PRIORITY)
            .cloned()?;
        if original.status != NodeStatus::Active || !original.is_failover_eligible() {
            return None;
        }
        if original.health_score <= ROLLBACK_HEALTH_THRESHOLD {
            return None;
        }

        let rule = last.rule_id.as_deref().and_then(|id| self.rules.get(id));
        let policy = rule.as_ref().map_or_else(
            || RollbackPolicy {
                min_stable_time_secs: self.default_min_stable.as_secs(),
                require_original_healthy: true,
            },
            |rule| rule.rollback.clone(),
        );
        if policy.require_original_healthy {
            if let Some(cause) = rule.as_ref().and_then(|rule| rule.triggered_by(&original)) {
                tracing::debug!(node = %original.id, cause = %cause, "Original still trips its failover rule");
                return None;
            }
        }

        let stable_for = (now - last.timestamp).to_std().unwrap_or_default();
        if stable_for <= Duration::from_secs(policy.min_stable_time_secs) {
            tracing::debug!(
                node = %original.id,
                stable_secs = stable_for.as_secs(),
                required_secs = policy.min_stable_time_secs,
                "Rollback held back until the failover has been stable long enough"
            );
            return None;
        }

        Some(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;
    use crate::failover::cutover::{CutoverPolicy, SettleCutover};
    use crate::registry::HealthUpdate;
    use crate::rules::FailoverRule;
    use crate::testing::node;
    use chrono::Duration as ChronoDuration;

    struct Fixture {
        registry: Arc<NodeRegistry>,
        events: Arc<EventLog>,
        rules: Arc<RuleEngine>,
        coordinator: Arc<FailoverCoordinator>,
        evaluator: RollbackEvaluator,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(NodeRegistry::new());
        registry.add_node(node("p", NodeRole::Primary, 1)).unwrap();
        registry.add_node(node("s1", NodeRole::Secondary, 2)).unwrap();
        registry.add_node(node("t1", NodeRole::Tertiary, 3)).unwrap();

        let events = Arc::new(EventLog::new());
        let rules = Arc::new(RuleEngine::new(vec![
            FailoverRule::critical(),
            FailoverRule::performance_degradation(),
        ]));
        let coordinator = Arc::new(FailoverCoordinator::new(
            registry.clone(),
            events.clone(),
            Arc::new(SettleCutover),
            CutoverPolicy::default(),
        ));
        let evaluator = RollbackEvaluator::new(
            registry.clone(),
            events.clone(),
            rules.clone(),
            coordinator.clone(),
            Duration::from_secs(300),
        );
        Fixture {
            registry,
            events,
            rules,
            coordinator,
            evaluator,
        }
    }

    fn set_score(registry: &NodeRegistry, id: &str, score: u8) {
        registry.apply_health(&[HealthUpdate {
            node_id: id.into(),
            health_score: score,
            response_time_ms: 50,
            load: None,
            uptime_percent: None,
            checked_at: Utc::now(),
        }]);
    }

    async fn fail_over(f: &Fixture, rule: &FailoverRule) -> DateTime<Utc> {
        let primary = f.registry.current_primary().unwrap();
        let outcome = f.coordinator.execute(&primary, rule).await;
        outcome.event().unwrap().timestamp
    }

    #[tokio::test]
    async fn test_nothing_to_do_without_a_failover() {
        let f = fixture();
        assert!(f.evaluator.tick().await.is_none());
    }

    #[tokio::test]
    async fn test_rolls_back_after_stable_time() {
        let f = fixture();
        let at = fail_over(&f, &FailoverRule::critical()).await;
        set_score(&f.registry, "p", 95);

        assert!(f.evaluator.tick_at(at + ChronoDuration::seconds(120)).await.is_none());
        assert_eq!(f.registry.current_primary().unwrap().id.as_str(), "s1");

        let outcome = f
            .evaluator
            .tick_at(at + ChronoDuration::seconds(301))
            .await
            .unwrap();
        assert!(outcome.is_completed());
        assert_eq!(f.registry.current_primary().unwrap().id.as_str(), "p");
        assert_eq!(f.events.last().unwrap().event_type, EventType::RolledBack);

        // Already back; nothing further happens.
        assert!(f.evaluator.tick_at(at + ChronoDuration::seconds(900)).await.is_none());
        assert_eq!(f.events.len(), 2);
    }

    #[tokio::test]
    async fn test_score_gate_applies_regardless_of_policy() {
        let f = fixture();
        let at = fail_over(&f, &FailoverRule::critical()).await;
        set_score(&f.registry, "p", 75);
        assert!(f.evaluator.candidate(at + ChronoDuration::hours(1)).is_none());

        let mut relaxed = FailoverRule::critical();
        relaxed.rollback.require_original_healthy = false;
        f.rules.update_rule(relaxed).unwrap();
        set_score(&f.registry, "p", 61);
        assert!(f.evaluator.candidate(at + ChronoDuration::hours(1)).is_none());

        set_score(&f.registry, "p", 81);
        assert!(f.evaluator.candidate(at + ChronoDuration::hours(1)).is_some());
    }

    #[tokio::test]
    async fn test_original_must_clear_its_rule() {
        let f = fixture();
        let mut strict = FailoverRule::critical();
        strict.trigger.health_score_threshold = 90;
        f.rules.update_rule(strict.clone()).unwrap();
        let at = fail_over(&f, &strict).await;
        set_score(&f.registry, "p", 85);

        assert!(f.evaluator.candidate(at + ChronoDuration::hours(1)).is_none());

        strict.rollback.require_original_healthy = false;
        f.rules.update_rule(strict).unwrap();
        assert!(f.evaluator.candidate(at + ChronoDuration::hours(1)).is_some());
    }

    #[tokio::test]
    async fn test_stable_time_follows_triggering_rule() {
        let f = fixture();
        let at = fail_over(&f, &FailoverRule::performance_degradation()).await;
        set_score(&f.registry, "p", 95);

        assert!(f.evaluator.candidate(at + ChronoDuration::seconds(400)).is_none());
        assert!(f.evaluator.candidate(at + ChronoDuration::seconds(601)).is_some());
    }

    #[tokio::test]
    async fn test_manual_failover_uses_default_stable_time() {
        let f = fixture();
        let outcome = f.coordinator.manual_failover(&"s1".into()).await;
        let at = outcome.event().unwrap().timestamp;

        assert!(f.evaluator.candidate(at + ChronoDuration::seconds(299)).is_none());
        assert!(f.evaluator.candidate(at + ChronoDuration::seconds(301)).is_some());
    }

    #[tokio::test]
    async fn test_maintenance_blocks_rollback() {
        let f = fixture();
        let at = fail_over(&f, &FailoverRule::critical()).await;
        f.registry.set_maintenance(&"p".into(), true).unwrap();

        assert!(f.evaluator.tick_at(at + ChronoDuration::hours(1)).await.is_none());
        assert_eq!(f.registry.current_primary().unwrap().id.as_str(), "s1");
    }
}

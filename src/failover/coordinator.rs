//! Failover execution.
//!
//! # Responsibilities
//! - Pick the best promotion target for a failing primary
//! - Run the cutover for the rule's strategy, then swap roles
//! - Record every attempt in the event log
//! - Guarantee at most one role swap is pending at any time

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::time;

use crate::events::{EventLog, EventType, FailoverEvent};
use crate::failover::cutover::{Cutover, CutoverError, CutoverKind, CutoverPolicy};
use crate::observability::metrics;
use crate::registry::{Node, NodeId, NodeRegistry, RegistryError};
use crate::rules::FailoverRule;

#[derive(Debug, Error)]
enum CutoverFailure {
    #[error(transparent)]
    Cutover(#[from] CutoverError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Why a request was declined without touching any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    InFlight,
    ManualOnlyRule,
    NoPrimary,
    UnknownTarget,
    TargetAlreadyPrimary,
    IneligibleTarget,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::InFlight => "in_flight",
            RejectReason::ManualOnlyRule => "manual_only_rule",
            RejectReason::NoPrimary => "no_primary",
            RejectReason::UnknownTarget => "unknown_target",
            RejectReason::TargetAlreadyPrimary => "target_already_primary",
            RejectReason::IneligibleTarget => "ineligible_target",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one failover, manual failover or rollback request.
#[derive(Debug, Clone, PartialEq)]
pub enum FailoverOutcome {
    /// Roles were swapped; carries the `completed` or `rolled_back` event.
    Completed(FailoverEvent),
    /// The attempt ran and failed; carries the `failed` event.
    Failed(FailoverEvent),
    Rejected(RejectReason),
}

impl FailoverOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, FailoverOutcome::Completed(_))
    }

    pub fn event(&self) -> Option<&FailoverEvent> {
        match self {
            FailoverOutcome::Completed(event) | FailoverOutcome::Failed(event) => Some(event),
            FailoverOutcome::Rejected(_) => None,
        }
    }
}

/// Clears the in-flight flag when dropped, on every exit path.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        metrics::record_in_flight(false);
    }
}

pub struct FailoverCoordinator {
    registry: Arc<NodeRegistry>,
    events: Arc<EventLog>,
    cutover: Arc<dyn Cutover>,
    policy: CutoverPolicy,
    in_flight: AtomicBool,
}

impl FailoverCoordinator {
    pub fn new(
        registry: Arc<NodeRegistry>,
        events: Arc<EventLog>,
        cutover: Arc<dyn Cutover>,
        policy: CutoverPolicy,
    ) -> Self {
        Self {
            registry,
            events,
            cutover,
            policy,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        metrics::record_in_flight(true);
        Some(InFlightGuard {
            flag: &self.in_flight,
        })
    }

    fn reject(&self, reason: RejectReason, subject: &NodeId) -> FailoverOutcome {
        tracing::warn!(node = %subject, reason = %reason, "Failover request declined");
        metrics::record_rejected_trigger(reason.as_str());
        FailoverOutcome::Rejected(reason)
    }

    /// Best promotion candidate: active, synced, lowest priority, then highest score.
    pub fn select_target(&self, failed: &Node) -> Option<Node> {
        let snapshot = self.registry.snapshot();
        let mut candidates: Vec<&Node> = snapshot
            .values()
            .filter(|n| n.id != failed.id && n.is_failover_eligible())
            .collect();
        candidates.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.health_score.cmp(&a.health_score))
        });
        candidates.first().map(|n| (*n).clone())
    }

    /// Fail over away from `failed` as directed by `rule`.
    pub async fn execute(&self, failed: &Node, rule: &FailoverRule) -> FailoverOutcome {
        let Some(kind) = CutoverKind::for_strategy(rule.strategy) else {
            return self.reject(RejectReason::ManualOnlyRule, &failed.id);
        };
        let Some(_guard) = self.try_begin() else {
            return self.reject(RejectReason::InFlight, &failed.id);
        };
        let started = Instant::now();

        let Some(target) = self.select_target(failed) else {
            let elapsed = started.elapsed();
            let event = FailoverEvent::new(EventType::Failed, failed.id.clone(), "no suitable target")
                .with_rule(&rule.id)
                .with_timing(elapsed, elapsed);
            return FailoverOutcome::Failed(self.events.append(event));
        };

        tracing::warn!(
            from = %failed.id,
            to = %target.id,
            rule = %rule.id,
            strategy = kind.as_str(),
            "Triggering failover"
        );

        match self.cut_over(failed, &target, kind).await {
            Ok(()) => {
                let event = FailoverEvent::new(
                    EventType::Completed,
                    failed.id.clone(),
                    format!("failover completed using {} strategy", kind.as_str()),
                )
                .with_target(target.id.clone())
                .with_rule(&rule.id)
                .with_timing(started.elapsed(), self.policy.window(kind));
                FailoverOutcome::Completed(self.events.append(event))
            }
            Err(e) => {
                let elapsed = started.elapsed();
                let event = FailoverEvent::new(EventType::Failed, failed.id.clone(), e.to_string())
                    .with_target(target.id.clone())
                    .with_rule(&rule.id)
                    .with_timing(elapsed, elapsed);
                FailoverOutcome::Failed(self.events.append(event))
            }
        }
    }

    /// Operator-requested promotion of `target_id`, using the immediate window.
    pub async fn manual_failover(&self, target_id: &NodeId) -> FailoverOutcome {
        let Some(_guard) = self.try_begin() else {
            return self.reject(RejectReason::InFlight, target_id);
        };
        let Some(primary) = self.registry.current_primary() else {
            return self.reject(RejectReason::NoPrimary, target_id);
        };
        let Some(target) = self.registry.get_node(target_id) else {
            return self.reject(RejectReason::UnknownTarget, target_id);
        };
        if target.id == primary.id {
            return self.reject(RejectReason::TargetAlreadyPrimary, target_id);
        }
        if !target.is_failover_eligible() {
            return self.reject(RejectReason::IneligibleTarget, target_id);
        }

        tracing::warn!(from = %primary.id, to = %target.id, "Manual failover requested");
        let started = Instant::now();
        let kind = CutoverKind::Immediate;

        match self.cut_over(&primary, &target, kind).await {
            Ok(()) => {
                let event = FailoverEvent::new(EventType::Completed, primary.id.clone(), "manual failover")
                    .with_target(target.id.clone())
                    .with_timing(started.elapsed(), self.policy.window(kind));
                FailoverOutcome::Completed(self.events.append(event))
            }
            Err(e) => {
                let elapsed = started.elapsed();
                let event = FailoverEvent::new(
                    EventType::Failed,
                    primary.id.clone(),
                    format!("manual failover failed: {}", e),
                )
                .with_target(target.id.clone())
                .with_timing(elapsed, elapsed);
                FailoverOutcome::Failed(self.events.append(event))
            }
        }
    }

    /// Hand the primary role back to `original`.
    pub async fn rollback(&self, original: &NodeId) -> FailoverOutcome {
        let Some(_guard) = self.try_begin() else {
            return self.reject(RejectReason::InFlight, original);
        };
        let Some(primary) = self.registry.current_primary() else {
            return self.reject(RejectReason::NoPrimary, original);
        };
        let Some(target) = self.registry.get_node(original) else {
            return self.reject(RejectReason::UnknownTarget, original);
        };
        if target.id == primary.id {
            return self.reject(RejectReason::TargetAlreadyPrimary, original);
        }

        tracing::info!(from = %primary.id, to = %target.id, "Triggering rollback");
        let started = Instant::now();
        let kind = CutoverKind::Rollback;

        let (event_type, reason, downtime) = match self.cut_over(&primary, &target, kind).await {
            Ok(()) => (
                EventType::RolledBack,
                "automatic rollback to designated primary".to_string(),
                self.policy.window(kind),
            ),
            Err(e) => (EventType::Failed, format!("rollback failed: {}", e), started.elapsed()),
        };

        let event = FailoverEvent::new(event_type, primary.id.clone(), reason)
            .with_target(target.id.clone())
            .with_timing(started.elapsed(), downtime);
        let event = self.events.append(event);

        if event_type == EventType::RolledBack {
            FailoverOutcome::Completed(event)
        } else {
            FailoverOutcome::Failed(event)
        }
    }

    /// Drain within the deadline, then swap. Registry is untouched on error.
    async fn cut_over(&self, from: &Node, to: &Node, kind: CutoverKind) -> Result<(), CutoverFailure> {
        let window = self.policy.window(kind);
        let deadline = self.policy.deadline(kind);

        match time::timeout(deadline, self.cutover.drain(from, to, window)).await {
            Ok(drained) => drained?,
            Err(_) => return Err(CutoverError::DeadlineExceeded(deadline.as_millis() as u64).into()),
        }

        self.registry.swap_roles(&from.id, &to.id)?;
        Ok(())
    }
}

impl fmt::Debug for FailoverCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailoverCoordinator")
            .field("policy", &self.policy)
            .field("in_flight", &self.is_in_flight())
            .finish()
    }
}

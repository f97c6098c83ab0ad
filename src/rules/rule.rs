//! Failover rule definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::Node;
use crate::rules::engine::RuleError;

/// How the coordinator performs a failover triggered by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverStrategy {
    /// Short cutover window.
    Immediate,
    /// Long cutover window for connection draining.
    Graceful,
    /// Never executed automatically; waits for an operator.
    ManualOnly,
}

/// Conditions on the primary, any one of which fires the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerThresholds {
    pub health_score_threshold: u8,
    pub response_time_threshold_ms: u64,
    pub uptime_threshold: f64,
    pub consecutive_failures: u32,
    /// Advisory cadence for operators; evaluation runs on the evaluation loop.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

fn default_check_interval() -> u64 {
    30
}

/// When it is safe to return to the designated primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackPolicy {
    pub min_stable_time_secs: u64,
    #[serde(default = "default_true")]
    pub require_original_healthy: bool,
}

fn default_true() -> bool {
    true
}

/// A prioritized failover rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverRule {
    pub id: String,
    pub name: String,
    pub trigger: TriggerThresholds,
    pub strategy: FailoverStrategy,
    pub rollback: RollbackPolicy,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lower is evaluated first.
    pub priority: u32,
}

impl FailoverRule {
    /// The default critical rule: score 50, 5s latency, 95% uptime, 3 failures.
    pub fn critical() -> Self {
        Self {
            id: "critical_failover".to_string(),
            name: "Critical Failover Rule".to_string(),
            trigger: TriggerThresholds {
                health_score_threshold: 50,
                response_time_threshold_ms: 5000,
                uptime_threshold: 95.0,
                consecutive_failures: 3,
                check_interval_secs: 30,
            },
            strategy: FailoverStrategy::Immediate,
            rollback: RollbackPolicy {
                min_stable_time_secs: 300,
                require_original_healthy: true,
            },
            enabled: true,
            priority: 1,
        }
    }

    /// The default degradation rule: score 70, 2s latency, 98% uptime, 5 failures.
    pub fn performance_degradation() -> Self {
        Self {
            id: "performance_degradation".to_string(),
            name: "Performance Degradation Rule".to_string(),
            trigger: TriggerThresholds {
                health_score_threshold: 70,
                response_time_threshold_ms: 2000,
                uptime_threshold: 98.0,
                consecutive_failures: 5,
                check_interval_secs: 60,
            },
            strategy: FailoverStrategy::Graceful,
            rollback: RollbackPolicy {
                min_stable_time_secs: 600,
                require_original_healthy: true,
            },
            enabled: true,
            priority: 2,
        }
    }

    /// Range checks applied to every rule before the engine accepts it.
    pub fn validate(&self) -> Result<(), RuleError> {
        let invalid = |field: &'static str, message: &'static str| -> Result<(), RuleError> {
            Err(RuleError::Invalid {
                rule: self.id.clone(),
                field,
                message,
            })
        };
        if self.id.trim().is_empty() {
            return invalid("id", "must not be empty");
        }
        if self.trigger.health_score_threshold > 100 {
            return invalid("trigger.health_score_threshold", "must be between 0 and 100");
        }
        if !(0.0..=100.0).contains(&self.trigger.uptime_threshold) {
            return invalid("trigger.uptime_threshold", "must be between 0 and 100");
        }
        if self.trigger.consecutive_failures == 0 {
            return invalid("trigger.consecutive_failures", "must be at least 1");
        }
        Ok(())
    }

    /// The first condition that holds for `node`, checked in a fixed order.
    pub fn triggered_by(&self, node: &Node) -> Option<TriggerCause> {
        let t = &self.trigger;
        if node.health_score < t.health_score_threshold {
            return Some(TriggerCause::HealthScore {
                score: node.health_score,
                threshold: t.health_score_threshold,
            });
        }
        if node.response_time_ms > t.response_time_threshold_ms {
            return Some(TriggerCause::ResponseTime {
                response_time_ms: node.response_time_ms,
                threshold_ms: t.response_time_threshold_ms,
            });
        }
        if node.uptime_percent < t.uptime_threshold {
            return Some(TriggerCause::Uptime {
                uptime_percent: node.uptime_percent,
                threshold: t.uptime_threshold,
            });
        }
        if node.consecutive_failures >= t.consecutive_failures {
            return Some(TriggerCause::ConsecutiveFailures {
                failures: node.consecutive_failures,
                threshold: t.consecutive_failures,
            });
        }
        None
    }
}

/// Which threshold a primary crossed.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerCause {
    HealthScore { score: u8, threshold: u8 },
    ResponseTime { response_time_ms: u64, threshold_ms: u64 },
    Uptime { uptime_percent: f64, threshold: f64 },
    ConsecutiveFailures { failures: u32, threshold: u32 },
}

impl fmt::Display for TriggerCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerCause::HealthScore { score, threshold } => {
                write!(f, "health score {} below {}", score, threshold)
            }
            TriggerCause::ResponseTime { response_time_ms, threshold_ms } => {
                write!(f, "response time {}ms above {}ms", response_time_ms, threshold_ms)
            }
            TriggerCause::Uptime { uptime_percent, threshold } => {
                write!(f, "uptime {:.2}% below {:.2}%", uptime_percent, threshold)
            }
            TriggerCause::ConsecutiveFailures { failures, threshold } => {
                write!(f, "{} consecutive failures (limit {})", failures, threshold)
            }
        }
    }
}

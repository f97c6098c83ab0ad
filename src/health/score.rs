//! Health scoring.
//!
//! The score is a 0–100 composite of latency, CPU, memory and uptime. It is
//! the only precisely specified decision input: status bands and the
//! consecutive-failure counter are both derived from it.

use serde::{Deserialize, Serialize};

use crate::registry::NodeStatus;

/// Checks scoring below this count as failures.
pub const FAILURE_SCORE_THRESHOLD: u8 = 50;

/// Scores at or above this are `active`.
pub const ACTIVE_SCORE_THRESHOLD: u8 = 60;

/// Scores below this are `failed`.
pub const FAILED_SCORE_THRESHOLD: u8 = 30;

/// Resource utilization reported by a probe, each in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceMetrics {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub network: f64,
}

fn latency_penalty(response_time_ms: u64) -> i32 {
    match response_time_ms {
        t if t > 5000 => 30,
        t if t > 2000 => 20,
        t if t > 1000 => 10,
        _ => 0,
    }
}

fn utilization_penalty(percent: f64) -> i32 {
    if percent > 90.0 {
        25
    } else if percent > 80.0 {
        15
    } else if percent > 70.0 {
        10
    } else {
        0
    }
}

fn uptime_penalty(uptime_percent: f64) -> i32 {
    if uptime_percent < 95.0 {
        20
    } else if uptime_percent < 98.0 {
        10
    } else {
        0
    }
}

/// Score a successful health check.
pub fn compute_health_score(response_time_ms: u64, metrics: &ResourceMetrics, uptime_percent: f64) -> u8 {
    let score = 100
        - latency_penalty(response_time_ms)
        - utilization_penalty(metrics.cpu)
        - utilization_penalty(metrics.memory)
        - uptime_penalty(uptime_percent);
    score.clamp(0, 100) as u8
}

/// Map a score onto its status band.
pub fn status_for_score(score: u8) -> NodeStatus {
    if score < FAILED_SCORE_THRESHOLD {
        NodeStatus::Failed
    } else if score < ACTIVE_SCORE_THRESHOLD {
        NodeStatus::Inactive
    } else {
        NodeStatus::Active
    }
}

pub fn is_failing(score: u8) -> bool {
    score < FAILURE_SCORE_THRESHOLD
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the arbiter.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::registry::{DataSyncStatus, NodeId, NodeRole};
use crate::rules::FailoverRule;

/// Root configuration for the failover arbiter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Health monitor cadence and history retention.
    pub monitor: MonitorConfig,

    /// Rule evaluation and rollback cadence.
    pub evaluation: EvaluationConfig,

    /// Cutover windows per strategy.
    pub strategy: StrategyConfig,

    /// HTTP health probe settings.
    pub probe: ProbeConfig,

    /// Nodes registered at startup.
    pub nodes: Vec<NodeConfig>,

    /// Failover rules. Defaults to the critical and degradation rules.
    pub rules: Vec<FailoverRule>,

    pub admin: AdminConfig,

    pub observability: ObservabilityConfig,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            evaluation: EvaluationConfig::default(),
            strategy: StrategyConfig::default(),
            probe: ProbeConfig::default(),
            nodes: Vec::new(),
            rules: vec![
                FailoverRule::critical(),
                FailoverRule::performance_degradation(),
            ],
            admin: AdminConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Health monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Probe round interval in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub probe_timeout_secs: u64,

    /// Results kept per node.
    pub history_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            probe_timeout_secs: 5,
            history_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Rule evaluation and rollback check interval in seconds.
    pub interval_secs: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

/// Cutover timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub immediate_window_secs: u64,
    pub graceful_window_secs: u64,
    pub rollback_window_secs: u64,

    /// Slack on top of each window before a cutover is abandoned.
    pub cutover_grace_secs: u64,

    /// Stable time required before rolling back a failover with no rule.
    pub default_min_stable_secs: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            immediate_window_secs: 5,
            graceful_window_secs: 30,
            rollback_window_secs: 10,
            cutover_grace_secs: 5,
            default_min_stable_secs: 300,
        }
    }
}

/// HTTP health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Path probed on every node.
    pub path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
        }
    }
}

/// A node registered at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    /// Explicit id. Derived from `name` when absent.
    #[serde(default)]
    pub id: Option<String>,

    pub name: String,

    /// `host:port` or a full base URL.
    pub address: String,

    #[serde(default)]
    pub region: String,

    pub role: NodeRole,

    /// Promotion order, 1 = designated primary.
    pub priority: u32,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub data_sync_status: DataSyncStatus,

    #[serde(default = "default_uptime")]
    pub uptime_percent: f64,
}

fn default_uptime() -> f64 {
    100.0
}

impl NodeConfig {
    /// The configured id, or the name lowercased with whitespace replaced by `_`.
    pub fn node_id(&self) -> NodeId {
        match &self.id {
            Some(id) => NodeId::new(id.clone()),
            None => NodeId::new(
                self.name
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join("_")
                    .to_lowercase(),
            ),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

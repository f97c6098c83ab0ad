//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every registered node, concurrently
//! - Score each result and fold the whole tick into the registry at once
//! - Keep the bounded per-node history

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::MonitorConfig;
use crate::health::history::{HealthCheckResult, HealthHistory};
use crate::health::probe::{HealthProbe, ProbeError};
use crate::health::score::{compute_health_score, ResourceMetrics};
use crate::observability::metrics;
use crate::registry::{HealthUpdate, Node, NodeRegistry};

pub struct HealthMonitor {
    registry: Arc<NodeRegistry>,
    probe: Arc<dyn HealthProbe>,
    history: Arc<HealthHistory>,
    config: MonitorConfig,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<NodeRegistry>,
        probe: Arc<dyn HealthProbe>,
        history: Arc<HealthHistory>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            registry,
            probe,
            history,
            config,
        }
    }

    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.config.interval_secs,
            probe_timeout_secs = self.config.probe_timeout_secs,
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs.max(1));
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Probe every node concurrently, then commit all results in one registry write.
    pub async fn tick(&self) -> Vec<HealthCheckResult> {
        let snapshot = self.registry.snapshot();
        let checks = snapshot.values().map(|node| self.check_node(node));
        let outcomes = join_all(checks).await;

        let updates: Vec<HealthUpdate> = outcomes.iter().map(|(_, update)| update.clone()).collect();
        let applied = self.registry.apply_health(&updates);

        let mut results = Vec::with_capacity(outcomes.len());
        for (result, _) in outcomes {
            metrics::record_node_health(result.node_id.as_str(), result.health_score);
            self.history.record(result.clone());
            results.push(result);
        }

        tracing::debug!(checked = results.len(), applied, "Health tick complete");
        results
    }

    async fn check_node(&self, node: &Node) -> (HealthCheckResult, HealthUpdate) {
        let started = Instant::now();
        let timeout = Duration::from_secs(self.config.probe_timeout_secs);

        let outcome = match time::timeout(timeout, self.probe.check(node)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::Timeout(timeout.as_millis() as u64)),
        };
        let checked_at = Utc::now();

        match outcome {
            Ok(report) => {
                let uptime = report.uptime_percent.unwrap_or(node.uptime_percent);
                let score = compute_health_score(report.response_time_ms, &report.metrics, uptime);
                let result = HealthCheckResult {
                    node_id: node.id.clone(),
                    timestamp: checked_at,
                    response_time_ms: report.response_time_ms,
                    status_code: Some(report.status_code),
                    error: None,
                    health_score: score,
                    metrics: report.metrics,
                };
                let update = HealthUpdate {
                    node_id: node.id.clone(),
                    health_score: score,
                    response_time_ms: report.response_time_ms,
                    load: Some(report.metrics.cpu / 100.0),
                    uptime_percent: report.uptime_percent,
                    checked_at,
                };
                (result, update)
            }
            Err(e) => {
                tracing::warn!(node = %node.id, error = %e, "Health check failed");
                metrics::record_probe_failure(node.id.as_str());

                let elapsed_ms = started.elapsed().as_millis() as u64;
                let result = HealthCheckResult {
                    node_id: node.id.clone(),
                    timestamp: checked_at,
                    response_time_ms: elapsed_ms,
                    status_code: e.status_code(),
                    error: Some(e.to_string()),
                    health_score: 0,
                    metrics: ResourceMetrics::default(),
                };
                let update = HealthUpdate {
                    node_id: node.id.clone(),
                    health_score: 0,
                    response_time_ms: elapsed_ms,
                    load: None,
                    uptime_percent: None,
                    checked_at,
                };
                (result, update)
            }
        }
    }
}

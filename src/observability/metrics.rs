//! Metrics collection and exposition.
//!
//! # Metrics
//! - `failover_events_total` (counter): events appended, by type and success
//! - `failover_node_health_score` (gauge): latest score per node
//! - `failover_probe_failures_total` (counter): failed or timed-out probes per node
//! - `failover_rejected_triggers_total` (counter): declined requests by reason
//! - `failover_in_flight` (gauge): 1 while a role swap is pending

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_node_health(node: &str, score: u8) {
    gauge!("failover_node_health_score", "node" => node.to_string()).set(score as f64);
}

pub fn record_probe_failure(node: &str) {
    counter!("failover_probe_failures_total", "node" => node.to_string()).increment(1);
}

pub fn record_failover_event(event_type: &'static str, success: bool) {
    counter!(
        "failover_events_total",
        "type" => event_type,
        "success" => if success { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_rejected_trigger(reason: &'static str) {
    counter!("failover_rejected_triggers_total", "reason" => reason).increment(1);
}

pub fn record_in_flight(in_flight: bool) {
    gauge!("failover_in_flight").set(if in_flight { 1.0 } else { 0.0 });
}

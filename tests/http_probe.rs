//! HTTP probe against real sockets, and through the monitor.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use failover_arbiter::config::ProbeConfig;
use failover_arbiter::health::{HealthProbe, HttpProbe, ProbeError};
use failover_arbiter::registry::{Node, NodeRole, NodeStatus};
use failover_arbiter::FailoverService;

mod common;

fn node_at(id: &str, role: NodeRole, priority: u32, addr: std::net::SocketAddr) -> Node {
    let mut config = common::node_config(id, role, priority);
    config.address = addr.to_string();
    Node::from(config)
}

#[tokio::test]
async fn test_reads_metrics_payload() {
    let addr = common::start_programmable_backend(|| async {
        (200, r#"{"cpu": 91.0, "memory": 40.0, "uptime": 97.5}"#.to_string())
    })
    .await;
    let probe = HttpProbe::new(ProbeConfig::default());

    let report = probe
        .check(&node_at("a", NodeRole::Primary, 1, addr))
        .await
        .unwrap();

    assert_eq!(report.status_code, 200);
    assert_eq!(report.metrics.cpu, 91.0);
    assert_eq!(report.metrics.memory, 40.0);
    assert_eq!(report.metrics.disk, 0.0);
    assert_eq!(report.uptime_percent, Some(97.5));
}

#[tokio::test]
async fn test_plain_body_is_scored_on_latency_alone() {
    let addr = common::start_programmable_backend(|| async { (200, "OK".to_string()) }).await;
    let probe = HttpProbe::new(ProbeConfig::default());

    let report = probe
        .check(&node_at("a", NodeRole::Primary, 1, addr))
        .await
        .unwrap();

    assert_eq!(report.metrics, Default::default());
    assert_eq!(report.uptime_percent, None);
}

#[tokio::test]
async fn test_error_status_is_a_failure() {
    let addr = common::start_programmable_backend(|| async { (503, "down".to_string()) }).await;
    let probe = HttpProbe::new(ProbeConfig::default());

    let err = probe
        .check(&node_at("a", NodeRole::Primary, 1, addr))
        .await
        .unwrap_err();
    assert_eq!(err, ProbeError::Status(503));
    assert_eq!(err.status_code(), Some(503));
}

#[tokio::test]
async fn test_refused_connection() {
    let addr = common::closed_addr().await;
    let probe = HttpProbe::new(ProbeConfig::default());

    let err = probe
        .check(&node_at("a", NodeRole::Primary, 1, addr))
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Connection(_)));
}

#[tokio::test]
async fn test_monitor_fails_over_from_unreachable_primary() {
    let healthy = common::start_programmable_backend(|| async {
        (200, r#"{"cpu": 10.0, "memory": 10.0}"#.to_string())
    })
    .await;
    let flaky_calls = Arc::new(AtomicU32::new(0));
    let calls = flaky_calls.clone();
    let flaky = common::start_programmable_backend(move || {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            (500, "boom".to_string())
        }
    })
    .await;

    let mut config = common::instant_fleet_config();
    config.nodes = Vec::new();
    let service = FailoverService::new(&config, Arc::new(HttpProbe::new(config.probe.clone()))).unwrap();
    service.register_node(node_at("p", NodeRole::Primary, 1, flaky)).unwrap();
    service.register_node(node_at("s1", NodeRole::Secondary, 2, healthy)).unwrap();

    let results = service.monitor_tick().await;
    assert_eq!(results.len(), 2);
    assert_eq!(flaky_calls.load(Ordering::SeqCst), 1);

    let primary = service.get_node(&"p".into()).unwrap();
    assert_eq!(primary.health_score, 0);
    assert_eq!(primary.status, NodeStatus::Failed);
    let last = service.node_health_history(&"p".into(), 1).pop().unwrap();
    assert_eq!(last.status_code, Some(500));
    assert!(last.error.is_some());

    assert!(service.evaluate().await.unwrap().is_completed());
    assert_eq!(service.current_primary().unwrap().id.as_str(), "s1");
}

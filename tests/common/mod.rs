//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use failover_arbiter::config::{ArbiterConfig, NodeConfig};
use failover_arbiter::health::{HealthProbe, ProbeError, ProbeReport, ResourceMetrics};
use failover_arbiter::registry::{DataSyncStatus, Node, NodeRole};
use failover_arbiter::FailoverService;

/// Probe whose answers are set per node id by the test.
#[derive(Default)]
pub struct ScriptedProbe {
    answers: Mutex<HashMap<String, Result<ProbeReport, ProbeError>>>,
}

impl ScriptedProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, node: &str, answer: Result<ProbeReport, ProbeError>) {
        self.answers.lock().unwrap().insert(node.to_string(), answer);
    }

    pub fn report(&self, node: &str, response_time_ms: u64, cpu: f64, memory: f64) {
        self.set(
            node,
            Ok(ProbeReport {
                response_time_ms,
                status_code: 200,
                metrics: ResourceMetrics {
                    cpu,
                    memory,
                    disk: 10.0,
                    network: 10.0,
                },
                uptime_percent: None,
            }),
        );
    }

    pub fn down(&self, node: &str) {
        self.set(node, Err(ProbeError::Connection("connection refused".into())));
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn check(&self, node: &Node) -> Result<ProbeReport, ProbeError> {
        self.answers
            .lock()
            .unwrap()
            .get(node.id.as_str())
            .cloned()
            .unwrap_or(Ok(ProbeReport {
                response_time_ms: 40,
                status_code: 200,
                metrics: ResourceMetrics::default(),
                uptime_percent: None,
            }))
    }
}

pub fn node_config(id: &str, role: NodeRole, priority: u32) -> NodeConfig {
    NodeConfig {
        id: Some(id.to_string()),
        name: format!("{} node", id),
        address: "127.0.0.1:1".to_string(),
        region: "test".to_string(),
        role,
        priority,
        capabilities: Vec::new(),
        data_sync_status: DataSyncStatus::Synced,
        uptime_percent: 100.0,
    }
}

/// Primary `p`, secondaries `s1`/`s2`, tertiary `t1`, default rules and windows.
pub fn fleet_config() -> ArbiterConfig {
    let mut config = ArbiterConfig::default();
    config.nodes = vec![
        node_config("p", NodeRole::Primary, 1),
        node_config("s1", NodeRole::Secondary, 2),
        node_config("s2", NodeRole::Secondary, 3),
        node_config("t1", NodeRole::Tertiary, 4),
    ];
    config
}

/// Same fleet with zero-length cutover windows.
pub fn instant_fleet_config() -> ArbiterConfig {
    let mut config = fleet_config();
    config.strategy.immediate_window_secs = 0;
    config.strategy.graceful_window_secs = 0;
    config.strategy.rollback_window_secs = 0;
    config
}

pub fn service(config: &ArbiterConfig, probe: Arc<ScriptedProbe>) -> FailoverService {
    FailoverService::new(config, probe).unwrap()
}

/// Start a programmable HTTP backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

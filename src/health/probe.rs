//! Health probes.
//!
//! # Responsibilities
//! - Define the `HealthProbe` seam the monitor calls once per node per tick
//! - Provide an HTTP implementation that reads resource metrics from the
//!   node's health endpoint
//!
//! # Design Decisions
//! - Probes do not enforce timeouts; the monitor wraps every call in its own
//! - A reachable endpoint that returns no metrics is scored on latency alone

use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Uri};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::ProbeConfig;
use crate::health::score::ResourceMetrics;
use crate::registry::Node;

/// Upper bound on a health payload we are willing to buffer.
const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Data returned by one successful check.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub response_time_ms: u64,
    pub status_code: u16,
    pub metrics: ResourceMetrics,
    /// Fresh uptime figure, when the node reports one.
    pub uptime_percent: Option<f64>,
}

/// Reasons a check produced no usable report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("health check timed out after {0} ms")]
    Timeout(u64),

    #[error("health check returned status {0}")]
    Status(u16),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid node address: {0}")]
    InvalidAddress(String),
}

impl ProbeError {
    /// HTTP status carried by the failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProbeError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// Performs a single health check against a single node.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self, node: &Node) -> Result<ProbeReport, ProbeError>;
}

/// JSON body served by a node's health endpoint. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HealthPayload {
    #[serde(flatten)]
    metrics: ResourceMetrics,
    uptime: Option<f64>,
}

/// Probe that issues `GET {address}{path}` over plain HTTP.
pub struct HttpProbe {
    client: Client<HttpConnector, Body>,
    config: ProbeConfig,
}

impl HttpProbe {
    pub fn new(config: ProbeConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, config }
    }

    /// Resolve the probe URI for a node. Bare `host:port` addresses get `http://`.
    pub fn probe_uri(&self, node: &Node) -> Result<Uri, ProbeError> {
        let base = if node.address.contains("://") {
            node.address.clone()
        } else {
            format!("http://{}", node.address)
        };

        let url = Url::parse(&base)
            .and_then(|u| u.join(&self.config.path))
            .map_err(|e| ProbeError::InvalidAddress(format!("{}: {}", node.address, e)))?;

        url.as_str()
            .parse::<Uri>()
            .map_err(|e| ProbeError::InvalidAddress(format!("{}: {}", node.address, e)))
    }

    async fn read_payload(&self, node: &Node, body: Incoming) -> HealthPayload {
        let bytes = match axum::body::to_bytes(Body::new(body), MAX_PAYLOAD_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(node = %node.id, error = %e, "Failed to read health payload");
                return HealthPayload::default();
            }
        };
        if bytes.is_empty() {
            return HealthPayload::default();
        }
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::debug!(node = %node.id, error = %e, "Health payload is not metrics JSON");
            HealthPayload::default()
        })
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn check(&self, node: &Node) -> Result<ProbeReport, ProbeError> {
        let uri = self.probe_uri(node)?;
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "failover-arbiter-probe")
            .body(Body::empty())
            .map_err(|e| ProbeError::Connection(e.to_string()))?;

        let started = Instant::now();
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ProbeError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let payload = self.read_payload(node, response.into_body()).await;
        Ok(ProbeReport {
            response_time_ms: started.elapsed().as_millis() as u64,
            status_code: status.as_u16(),
            metrics: payload.metrics,
            uptime_percent: payload.uptime,
        })
    }
}

impl std::fmt::Debug for HttpProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProbe")
            .field("path", &self.config.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeRole;
    use crate::testing::node;

    #[test]
    fn test_probe_uri_for_bare_address() {
        let probe = HttpProbe::new(ProbeConfig::default());
        let mut n = node("a", NodeRole::Primary, 1);
        n.address = "10.0.0.5:8080".to_string();
        assert_eq!(probe.probe_uri(&n).unwrap().to_string(), "http://10.0.0.5:8080/health");
    }

    #[test]
    fn test_probe_uri_keeps_scheme() {
        let probe = HttpProbe::new(ProbeConfig { path: "/status".to_string() });
        let mut n = node("a", NodeRole::Primary, 1);
        n.address = "http://primary.internal:9000".to_string();
        assert_eq!(probe.probe_uri(&n).unwrap().to_string(), "http://primary.internal:9000/status");
    }

    #[test]
    fn test_probe_uri_rejects_garbage() {
        let probe = HttpProbe::new(ProbeConfig::default());
        let mut n = node("a", NodeRole::Primary, 1);
        n.address = "http://".to_string();
        assert!(matches!(probe.probe_uri(&n), Err(ProbeError::InvalidAddress(_))));
    }

    #[test]
    fn test_payload_fields_are_optional() {
        let payload: HealthPayload = serde_json::from_str(r#"{"cpu": 85.0, "uptime": 97.5}"#).unwrap();
        assert_eq!(payload.metrics.cpu, 85.0);
        assert_eq!(payload.metrics.memory, 0.0);
        assert_eq!(payload.uptime, Some(97.5));
    }
}

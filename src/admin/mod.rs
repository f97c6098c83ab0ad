//! Admin HTTP API over the failover service.
//!
//! Every route sits under `/admin` and requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::Shutdown;
use crate::service::FailoverService;

/// Upper bound on one admin request; covers a manual cutover.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AdminState {
    pub service: Arc<FailoverService>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(service: Arc<FailoverService>, api_key: &str) -> Self {
        Self {
            service,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/nodes", get(list_nodes).post(register_node))
        .route("/admin/nodes/{id}", get(get_node).delete(remove_node))
        .route("/admin/nodes/{id}/history", get(node_history))
        .route("/admin/nodes/{id}/sync", put(set_sync_status))
        .route("/admin/nodes/{id}/maintenance", put(set_maintenance))
        .route("/admin/events", get(list_events))
        .route("/admin/failover", post(manual_failover))
        .route("/admin/rules", get(list_rules).post(add_rule))
        .route("/admin/rules/{id}", put(update_rule).delete(remove_rule))
        .route("/admin/rules/{id}/enabled", put(set_rule_enabled))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until shutdown is triggered.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    shutdown: Shutdown,
) -> std::io::Result<()> {
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Admin API listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admin::AdminState;
use crate::config::NodeConfig;
use crate::events::FailoverEvent;
use crate::failover::FailoverOutcome;
use crate::health::HealthCheckResult;
use crate::registry::{DataSyncStatus, Node, NodeFilter, NodeId, RegistryError};
use crate::rules::{FailoverRule, RuleError};
use crate::service::FailoverStatus;

const DEFAULT_EVENT_LIMIT: usize = 50;
const DEFAULT_HISTORY_HOURS: u32 = 24;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Registry(RegistryError::UnknownNode(_)) => StatusCode::NOT_FOUND,
            ApiError::Registry(RegistryError::DuplicateNode(_)) => StatusCode::CONFLICT,
            ApiError::Registry(RegistryError::InvariantViolation(_)) => StatusCode::CONFLICT,
            ApiError::Rule(RuleError::UnknownRule(_)) => StatusCode::NOT_FOUND,
            ApiError::Rule(RuleError::DuplicateRule(_)) => StatusCode::CONFLICT,
            ApiError::Rule(RuleError::Invalid { .. }) => StatusCode::BAD_REQUEST,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    #[serde(flatten)]
    pub failover: FailoverStatus,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        failover: state.service.failover_status(),
    })
}

pub async fn list_nodes(
    State(state): State<AdminState>,
    Query(filter): Query<NodeFilter>,
) -> Json<Vec<Node>> {
    Json(state.service.list_nodes(&filter))
}

#[derive(Serialize, Deserialize)]
pub struct Registered {
    pub id: NodeId,
}

pub async fn register_node(
    State(state): State<AdminState>,
    Json(config): Json<NodeConfig>,
) -> Result<(StatusCode, Json<Registered>), ApiError> {
    let id = state.service.register_node_config(config)?;
    Ok((StatusCode::CREATED, Json(Registered { id })))
}

pub async fn get_node(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<Node>, ApiError> {
    state
        .service
        .get_node(&NodeId::new(id.clone()))
        .map(Json)
        .ok_or(ApiError::NotFound(format!("node {}", id)))
}

pub async fn remove_node(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<Node>, ApiError> {
    Ok(Json(state.service.remove_node(&NodeId::new(id))?))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<u32>,
}

pub async fn node_history(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HealthCheckResult>>, ApiError> {
    let id = NodeId::new(id);
    if state.service.get_node(&id).is_none() {
        return Err(RegistryError::UnknownNode(id).into());
    }
    let hours = query.hours.unwrap_or(DEFAULT_HISTORY_HOURS);
    Ok(Json(state.service.node_health_history(&id, hours)))
}

#[derive(Serialize, Deserialize)]
pub struct SyncUpdate {
    pub status: DataSyncStatus,
}

pub async fn set_sync_status(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(update): Json<SyncUpdate>,
) -> Result<StatusCode, ApiError> {
    state.service.set_sync_status(&NodeId::new(id), update.status)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize, Deserialize)]
pub struct Toggle {
    pub enabled: bool,
}

pub async fn set_maintenance(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(toggle): Json<Toggle>,
) -> Result<StatusCode, ApiError> {
    state.service.set_maintenance(&NodeId::new(id), toggle.enabled)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

pub async fn list_events(
    State(state): State<AdminState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<FailoverEvent>> {
    Json(state.service.failover_events(query.limit.unwrap_or(DEFAULT_EVENT_LIMIT)))
}

#[derive(Serialize, Deserialize)]
pub struct FailoverRequest {
    pub target: NodeId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailoverResponse {
    pub completed: bool,
    pub event: Option<FailoverEvent>,
    /// Why the request was declined without an attempt.
    pub rejected: Option<String>,
}

pub async fn manual_failover(
    State(state): State<AdminState>,
    Json(request): Json<FailoverRequest>,
) -> (StatusCode, Json<FailoverResponse>) {
    let outcome = state.service.request_failover(&request.target).await;
    let status = match &outcome {
        FailoverOutcome::Completed(_) => StatusCode::OK,
        FailoverOutcome::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        FailoverOutcome::Rejected(_) => StatusCode::CONFLICT,
    };
    let rejected = match &outcome {
        FailoverOutcome::Rejected(reason) => Some(reason.to_string()),
        _ => None,
    };
    let body = FailoverResponse {
        completed: outcome.is_completed(),
        event: outcome.event().cloned(),
        rejected,
    };
    (status, Json(body))
}

pub async fn list_rules(State(state): State<AdminState>) -> Json<Vec<FailoverRule>> {
    Json(state.service.rules())
}

pub async fn add_rule(
    State(state): State<AdminState>,
    Json(rule): Json<FailoverRule>,
) -> Result<StatusCode, ApiError> {
    state.service.add_rule(rule)?;
    Ok(StatusCode::CREATED)
}

pub async fn update_rule(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(mut rule): Json<FailoverRule>,
) -> Result<StatusCode, ApiError> {
    rule.id = id;
    state.service.update_rule(rule)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_rule_enabled(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(toggle): Json<Toggle>,
) -> Result<StatusCode, ApiError> {
    state.service.set_rule_enabled(&id, toggle.enabled)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_rule(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<FailoverRule>, ApiError> {
    Ok(Json(state.service.remove_rule(&id)?))
}

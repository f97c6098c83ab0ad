//! Admin API routing, auth and error mapping.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use failover_arbiter::admin::{setup_admin_router, AdminState};
use failover_arbiter::FailoverService;

mod common;
use common::ScriptedProbe;

const KEY: &str = "test-key";

fn router() -> (Router, Arc<FailoverService>) {
    let service = Arc::new(common::service(
        &common::instant_fleet_config(),
        ScriptedProbe::new(),
    ));
    let router = setup_admin_router(AdminState::new(service.clone(), KEY));
    (router, service)
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", KEY));
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let (router, _) = router();

    let response = router
        .clone()
        .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(
            Request::get("/admin/status")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status() {
    let (router, _) = router();
    let (status, body) = call(&router, Method::GET, "/admin/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_primary"], "p");
    assert_eq!(body["total_nodes"], 4);
    assert_eq!(body["in_flight"], false);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_list_nodes_with_filter() {
    let (router, _) = router();

    let (status, body) = call(&router, Method::GET, "/admin/nodes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (_, body) = call(&router, Method::GET, "/admin/nodes?role=secondary", None).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["s1", "s2"]);
}

#[tokio::test]
async fn test_register_and_remove_node() {
    let (router, service) = router();
    let node = json!({
        "name": "Edge Replica",
        "address": "10.0.9.1:8080",
        "role": "tertiary",
        "priority": 9
    });

    let (status, body) = call(&router, Method::POST, "/admin/nodes", Some(node.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "edge_replica");
    assert!(service.get_node(&"edge_replica".into()).is_some());

    let (status, _) = call(&router, Method::POST, "/admin/nodes", Some(node)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&router, Method::DELETE, "/admin/nodes/edge_replica", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&router, Method::DELETE, "/admin/nodes/p", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&router, Method::GET, "/admin/nodes/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_failover_endpoint() {
    let (router, service) = router();

    let (status, body) = call(
        &router,
        Method::POST,
        "/admin/failover",
        Some(json!({ "target": "s2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], true);
    assert_eq!(body["event"]["event_type"], "completed");
    assert_eq!(service.current_primary().unwrap().id.as_str(), "s2");

    let (status, body) = call(
        &router,
        Method::POST,
        "/admin/failover",
        Some(json!({ "target": "s2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["rejected"], "target_already_primary");

    let (_, events) = call(&router, Method::GET, "/admin/events?limit=5", None).await;
    assert_eq!(events.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sync_and_maintenance_updates() {
    let (router, service) = router();

    let (status, _) = call(
        &router,
        Method::PUT,
        "/admin/nodes/s1/sync",
        Some(json!({ "status": "out_of_sync" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
        &router,
        Method::PUT,
        "/admin/nodes/s2/maintenance",
        Some(json!({ "enabled": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(
        &router,
        Method::POST,
        "/admin/failover",
        Some(json!({ "target": "s1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["rejected"], "ineligible_target");
    assert_eq!(service.current_primary().unwrap().id.as_str(), "p");
}

#[tokio::test]
async fn test_rule_management() {
    let (router, service) = router();

    let (_, rules) = call(&router, Method::GET, "/admin/rules", None).await;
    assert_eq!(rules.as_array().unwrap().len(), 2);

    let (status, _) = call(
        &router,
        Method::PUT,
        "/admin/rules/critical_failover/enabled",
        Some(json!({ "enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!service.rules()[0].enabled);

    let mut updated = serde_json::to_value(&service.rules()[1]).unwrap();
    updated["trigger"]["consecutive_failures"] = json!(8);
    let (status, _) = call(
        &router,
        Method::PUT,
        "/admin/rules/performance_degradation",
        Some(updated.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(service.rules()[1].trigger.consecutive_failures, 8);

    let (status, _) = call(&router, Method::PUT, "/admin/rules/nope", Some(updated.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut always = updated.clone();
    always["id"] = json!("always_fires");
    always["trigger"]["consecutive_failures"] = json!(0);
    let (status, body) = call(&router, Method::POST, "/admin/rules", Some(always)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("consecutive_failures"));

    let mut over = updated.clone();
    over["trigger"]["health_score_threshold"] = json!(101);
    let (status, _) = call(
        &router,
        Method::PUT,
        "/admin/rules/performance_degradation",
        Some(over),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(service.rules().len(), 2);
    assert_eq!(service.rules()[1].trigger.health_score_threshold, 70);

    let (status, _) = call(&router, Method::DELETE, "/admin/rules/critical_failover", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(service.rules().len(), 1);
}

#[tokio::test]
async fn test_node_history_endpoint() {
    let (router, service) = router();
    service.monitor_tick().await;

    let (status, body) = call(&router, Method::GET, "/admin/nodes/p/history?hours=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let uri = format!("/admin/nodes/p/history?hours={}", u32::MAX);
    let (status, body) = call(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = call(&router, Method::GET, "/admin/nodes/ghost/history", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

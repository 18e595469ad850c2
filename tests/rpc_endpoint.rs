//! The multiplexed JSON-RPC endpoint.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use waypoint::config::AppConfig;

mod common;
use common::{router, rpc_request, send, TestResponse};

fn call(id: Value, method: &str, params: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
}

async fn rpc(app: &axum::Router, body: String) -> TestResponse {
    send(app, rpc_request(body)).await
}

fn with_token(token: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.mcp.auth_token = Some(token.to_string());
    config
}

#[tokio::test]
async fn test_initialize_lists_declared_methods() {
    let app = router(AppConfig::default());
    let res = rpc(&app, call(json!(1), "initialize", json!({}))).await;

    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], 1);

    let manifest = &body["result"];
    assert_eq!(manifest["serverInfo"]["name"], "waypoint");
    assert!(manifest["protocolVersion"].is_string());

    let mut resources: Vec<&str> = manifest["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["method"].as_str().unwrap())
        .collect();
    resources.sort_unstable();
    assert_eq!(resources, ["users/get", "users/list"]);

    let mut tools: Vec<&str> = manifest["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    tools.sort_unstable();
    assert_eq!(tools, ["admin_tool", "create_user", "explode"]);

    let create = manifest["tools"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "create_user")
        .unwrap();
    assert_eq!(create["description"], "Create a user");
    assert_eq!(create["inputSchema"]["required"], json!(["email"]));
}

#[tokio::test]
async fn test_resource_and_tool_calls() {
    let app = router(AppConfig::default());

    let res = rpc(&app, call(json!("a"), "users/list", json!({}))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["result"], json!({"users": ["ada", "grace"]}));
    assert_eq!(res.json()["id"], "a");

    let res = rpc(&app, call(json!(2), "create_user", json!({"email": "ada@example.com"}))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["result"], json!({"created": "ada@example.com"}));
}

#[tokio::test]
async fn test_missing_required_arguments() {
    let app = router(AppConfig::default());
    let res = rpc(&app, call(json!(3), "create_user", json!({"name": "Ada"}))).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let error = &res.json()["error"];
    assert_eq!(error["code"], -32600);
    assert_eq!(error["data"]["missing"], json!(["email"]));
}

#[tokio::test]
async fn test_unknown_method_echoes_id() {
    let app = router(AppConfig::default());
    let res = rpc(&app, call(json!(7), "nope/nothing", json!({}))).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["id"], 7);
    assert_eq!(res.json()["error"]["code"], -32601);
}

#[tokio::test]
async fn test_malformed_envelopes() {
    let app = router(AppConfig::default());

    let res = rpc(&app, "{not json".to_string()).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["id"], Value::Null);
    assert_eq!(res.json()["error"]["message"], "Invalid JSON");

    let batch = json!([{"jsonrpc": "2.0", "id": 1, "method": "initialize"}]).to_string();
    let res = rpc(&app, batch).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"]["message"], "Batch requests are not supported");
}

#[tokio::test]
async fn test_notification_gets_empty_202() {
    let app = router(AppConfig::default());
    let body = json!({"jsonrpc": "2.0", "method": "users/list"}).to_string();
    let res = rpc(&app, body).await;

    assert_eq!(res.status, StatusCode::ACCEPTED);
    assert!(res.body.is_empty());
}

#[tokio::test]
async fn test_handler_panic_is_internal_error_without_detail() {
    let app = router(AppConfig::default());
    let res = rpc(&app, call(json!(9), "explode", json!({}))).await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json();
    assert_eq!(body["id"], 9);
    assert_eq!(body["error"]["code"], -32603);
    assert_eq!(body["error"]["message"], "Internal error");
    assert!(!res.text().contains("connection string"));
}

#[tokio::test]
async fn test_route_auth_applies_to_rpc() {
    let app = router(AppConfig::default());
    let res = rpc(&app, call(json!(4), "admin_tool", json!({}))).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["error"]["code"], -32003);

    let req = Request::post("/_mcp")
        .header("content-type", "application/json")
        .header("cookie", "waypoint_session=admin")
        .body(Body::from(call(json!(5), "admin_tool", json!({}))))
        .unwrap();
    let res = send(&app, req).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["result"], json!({"users": ["ada", "grace"]}));
}

#[tokio::test]
async fn test_endpoint_token_guard() {
    let app = router(with_token("s3cret"));

    let res = rpc(&app, call(json!(1), "users/list", json!({}))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["error"]["code"], -32000);
    assert_eq!(res.json()["error"]["message"], "Authentication required");

    let req = Request::post("/_mcp")
        .header("authorization", "Bearer wrong")
        .body(Body::from(call(json!(1), "users/list", json!({}))))
        .unwrap();
    let res = send(&app, req).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["error"]["code"], -32003);
    assert_eq!(res.json()["error"]["message"], "Invalid token");

    let req = Request::post("/_mcp")
        .header("x-mcp-token", "s3cret")
        .body(Body::from(call(json!(1), "users/list", json!({}))))
        .unwrap();
    let res = send(&app, req).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_unauthenticated_initialize_when_allowed() {
    let app = router(with_token("s3cret"));
    let res = rpc(&app, call(json!(1), "initialize", json!({}))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let mut config = with_token("s3cret");
    config.mcp.allow_unauthenticated_initialize = true;
    let app = router(config);

    let res = rpc(&app, call(json!(1), "initialize", json!({}))).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = rpc(&app, call(json!(2), "users/list", json!({}))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_on_endpoint_is_method_not_allowed() {
    let app = router(AppConfig::default());
    let res = send(&app, common::get("/_mcp")).await;

    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers["allow"], "POST");
}

#[tokio::test]
async fn test_disabled_endpoint_falls_through_to_routes() {
    let mut config = AppConfig::default();
    config.mcp.enabled = false;
    let app = router(config);

    let res = rpc(&app, call(json!(1), "initialize", json!({}))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.text(), "nothing at /_mcp");
}

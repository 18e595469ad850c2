//! Full server over a real socket.

use serde_json::{json, Value};
use waypoint::config::AppConfig;

mod common;
use common::start_server;

#[tokio::test]
async fn test_serves_routes_and_rpc_over_tcp() {
    let (addr, shutdown) = start_server(AppConfig::default()).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("http://{addr}/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let res = client
        .post(format!("http://{addr}/_mcp"))
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["result"]["serverInfo"]["name"], "waypoint");

    let res = client.get(format!("http://{addr}/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let (addr, shutdown) = start_server(AppConfig::default()).await;
    shutdown.trigger();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let result = reqwest::Client::new()
        .get(format!("http://{addr}/health"))
        .send()
        .await;
    assert!(result.is_err());
}
